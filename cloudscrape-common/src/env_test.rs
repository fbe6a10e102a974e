// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use super::*;

#[test]
fn truthy_values() {
  for value in ["y", "Y", "yes", "YES", "true", "True", " true "] {
    assert!(is_truthy(value), "{value}");
  }
  for value in ["", "n", "no", "false", "1", "on", "yess"] {
    assert!(!is_truthy(value), "{value}");
  }
}

#[test]
fn list_splitting() {
  assert_eq!(
    split_list("us-west-2, us-east-1,,eu-west-1 "),
    vec!["us-west-2", "us-east-1", "eu-west-1"]
  );
  assert!(split_list(" , ").is_empty());
}
