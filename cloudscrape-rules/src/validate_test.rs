// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use super::{Problems, ValidationError, Violation, ViolationCollector, is_valid_seconds};
use pretty_assertions::assert_eq;

#[test]
fn seconds() {
  assert!(is_valid_seconds(60));
  assert!(is_valid_seconds(300));
  assert!(!is_valid_seconds(0));
  assert!(!is_valid_seconds(-60));
  assert!(!is_valid_seconds(90));
}

#[test]
fn problems_accumulate() {
  let mut problems = Problems::new("metric");
  problems.check(true, "not reported");
  problems.check(false, "name is required");
  problems.check_seconds("period", None);
  problems.check_seconds("period", Some(30));
  assert_eq!(2, problems.len());

  let violation = problems.finish(()).unwrap_err();
  assert_eq!(
    Violation {
      entity: "metric".to_string(),
      problems: vec![
        "name is required".to_string(),
        "period must be a positive multiple of 60 seconds, got 30".to_string(),
      ],
    },
    violation
  );
  assert_eq!(
    "metric: name is required; period must be a positive multiple of 60 seconds, got 30",
    violation.to_string()
  );
}

#[test]
fn no_problems() {
  let problems = Problems::new("metric");
  assert_eq!(5, problems.finish(5).unwrap());
}

#[test]
fn collector() {
  let mut collector = ViolationCollector::default();
  assert_eq!(Some(1), collector.collect(Ok(1)));
  assert_eq!(
    None,
    collector.collect::<u32>(Err(Violation {
      entity: "a".to_string(),
      problems: vec!["bad".to_string()],
    }))
  );
  assert_eq!(
    None,
    collector.collect::<u32>(Err(Violation {
      entity: "b".to_string(),
      problems: vec!["worse".to_string()],
    }))
  );

  let error: ValidationError = collector.finish(()).unwrap_err();
  assert_eq!(2, error.violations.len());
  assert_eq!(
    "invalid configuration (2 violation(s)): a: bad | b: worse",
    error.to_string()
  );

  assert_eq!("ok", ViolationCollector::default().finish("ok").unwrap());
}
