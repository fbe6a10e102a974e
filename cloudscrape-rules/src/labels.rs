// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./labels_test.rs"]
mod labels_test;

use std::collections::BTreeMap;

/// An ordered label set, as handed to exposition.
pub type Labels = BTreeMap<String, String>;

/// Virtual label that refers to the series name during relabeling.
pub const METRIC_NAME_LABEL: &str = "__name__";

pub const REGION_LABEL: &str = "region";
pub const NAMESPACE_LABEL: &str = "namespace";
pub const ACCOUNT_ID_LABEL: &str = "account_id";
pub const FUNCTION_NAME_LABEL: &str = "d_function_name";

pub const DIMENSION_LABEL_PREFIX: &str = "d_";
pub const TAG_LABEL_PREFIX: &str = "tag_";

// Convert a cloud identifier to snake case. Word boundaries are lower to upper transitions and the
// last capital of an acronym that is followed by a lower case letter, so `DBInstanceIdentifier`
// becomes `db_instance_identifier`. Any non alphanumeric run becomes a single underscore.
#[must_use]
pub fn snake_case(name: &str) -> String {
  let chars: Vec<char> = name.chars().collect();
  let mut output = String::with_capacity(name.len() + 4);

  for (i, c) in chars.iter().copied().enumerate() {
    if !c.is_ascii_alphanumeric() {
      if !output.is_empty() && !output.ends_with('_') {
        output.push('_');
      }
      continue;
    }

    if c.is_ascii_uppercase() && i > 0 && !output.is_empty() && !output.ends_with('_') {
      let prev = chars[i - 1];
      let next_is_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
      if prev.is_ascii_lowercase()
        || ((prev.is_ascii_uppercase() || prev.is_ascii_digit()) && next_is_lower)
      {
        output.push('_');
      }
    }
    output.push(c.to_ascii_lowercase());
  }

  while output.ends_with('_') {
    output.pop();
  }
  output
}

#[must_use]
pub fn dimension_label(dimension: &str) -> String {
  format!("{DIMENSION_LABEL_PREFIX}{}", snake_case(dimension))
}

#[must_use]
pub fn tag_label(tag: &str) -> String {
  format!("{TAG_LABEL_PREFIX}{}", snake_case(tag))
}

// Namespaces are only lower cased, `AWS/DynamoDB` becomes `aws_dynamodb`.
#[must_use]
pub fn namespace_prefix(namespace: &str) -> String {
  let mut output = String::with_capacity(namespace.len());
  for c in namespace.chars() {
    if c.is_ascii_alphanumeric() {
      output.push(c.to_ascii_lowercase());
    } else if !output.is_empty() && !output.ends_with('_') {
      output.push('_');
    }
  }
  output.trim_end_matches('_').to_string()
}

// Name of the series for one statistic of a namespace metric, e.g.
// `aws_dynamodb_successful_request_latency_avg`.
#[must_use]
pub fn series_name(namespace: &str, metric: &str, statistic_suffix: &str) -> String {
  format!(
    "{}_{}_{statistic_suffix}",
    namespace_prefix(namespace),
    snake_case(metric)
  )
}
