// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use super::LogExtractionRule;
use crate::config::LogScrapeConfig;
use crate::labels::Labels;
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

const SAMPLE: &str = "ERROR checkout failed for order 1234 after 35ms";

fn expected_labels() -> Labels {
  [
    ("d_level".to_string(), "ERROR".to_string()),
    ("d_operation".to_string(), "checkout".to_string()),
    ("d_summary".to_string(), "checkout/ERROR".to_string()),
  ]
  .into()
}

fn make_config() -> LogScrapeConfig {
  LogScrapeConfig {
    lambda_function_name: Some("checkout-.*".to_string()),
    function_names: ["billing-worker".to_string()].into(),
    log_filter_pattern: Some("ERROR".to_string()),
    regex_pattern: Some(r"(\w+) (\w+) failed for order (\d+) after (\d+)ms".to_string()),
    labels: [
      ("level".to_string(), "$1".to_string()),
      ("operation".to_string(), "$2".to_string()),
      ("summary".to_string(), "$2/$1".to_string()),
    ]
    .into(),
    sample_log_message: Some(SAMPLE.to_string()),
    sample_expected_labels: Some(expected_labels()),
  }
}

fn make_rule(config: &LogScrapeConfig) -> LogExtractionRule {
  LogExtractionRule::new(config, "logs[0]".to_string()).unwrap()
}

#[test]
fn sample_round_trip() {
  let rule = make_rule(&make_config());
  assert!(rule.is_valid());
  assert_eq!(expected_labels(), rule.extract(SAMPLE));
  assert_eq!(Some("ERROR"), rule.log_filter_pattern());
  assert_eq!("logs[0]", rule.entity());
}

#[test]
fn mutated_sample_invalidates() {
  let mut config = make_config();
  config.sample_log_message = Some(SAMPLE.replacen("order", "ordr", 1));
  let rule = make_rule(&config);
  assert!(!rule.is_valid());

  // Expected labels that disagree with the output also invalidate.
  let mut config = make_config();
  config
    .sample_expected_labels
    .as_mut()
    .unwrap()
    .insert("d_level".to_string(), "WARN".to_string());
  assert!(!make_rule(&config).is_valid());
}

#[test]
fn no_sample_is_valid() {
  let mut config = make_config();
  config.sample_log_message = None;
  assert!(make_rule(&config).is_valid());
}

#[test]
fn extract() {
  let rule = make_rule(&make_config());
  assert_eq!(
    expected_labels(),
    rule.extract("  ERROR checkout failed for order 1 after 2ms\n")
  );
  assert_eq!(
    Labels::from([
      ("d_level".to_string(), "WARN".to_string()),
      ("d_operation".to_string(), "refund".to_string()),
      ("d_summary".to_string(), "refund/WARN".to_string()),
    ]),
    rule.extract("WARN refund failed for order 9 after 100ms")
  );

  // The whole line has to match.
  assert!(rule.extract("prefix ERROR checkout failed for order 1 after 2ms").is_empty());
  assert!(rule.extract("START RequestId: 1234").is_empty());
}

#[test]
fn should_scrape() {
  let rule = make_rule(&make_config());
  assert!(rule.should_scrape("checkout-api"));
  assert!(rule.should_scrape("billing-worker"));
  assert!(!rule.should_scrape("billing-api"));
  assert!(!rule.should_scrape("my-checkout-api"));

  // An invalid rule only keeps its explicitly named functions.
  let mut config = make_config();
  config.sample_log_message = Some("garbage".to_string());
  let rule = make_rule(&config);
  assert!(!rule.is_valid());
  assert!(!rule.should_scrape("checkout-api"));
  assert!(rule.should_scrape("billing-worker"));
}

#[test]
fn structural_errors() {
  let violation = assert_matches!(
    LogExtractionRule::new(&LogScrapeConfig::default(), "logs[1]".to_string()),
    Err(violation) => violation
  );
  assert_eq!("logs[1]", violation.entity);
  assert_eq!(
    vec![
      "either lambda_function_name or function_names is required".to_string(),
      "regex_pattern is required".to_string(),
    ],
    violation.problems
  );

  let mut config = make_config();
  config.regex_pattern = Some("(unclosed".to_string());
  config.lambda_function_name = Some("[".to_string());
  let violation = assert_matches!(
    LogExtractionRule::new(&config, "logs[2]".to_string()),
    Err(violation) => violation
  );
  assert_eq!(2, violation.problems.len());
  assert!(violation.problems[0].starts_with("lambda_function_name:"));
  assert!(violation.problems[1].starts_with("regex_pattern:"));
}
