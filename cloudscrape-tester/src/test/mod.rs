// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use crate::{check, run};

const SCRAPE_CONFIG: &str = r#"
namespaces:
  - name: AWS/Lambda
    metrics:
      - name: Invocations
        stats: [Sum]
    logs:
      - lambda_function_name: ".+-handler"
        regex_pattern: ".*OrderRequest: (.+) from (.+)"
        labels:
          source: "$2"
          destination: "$1"
        sample_log_message: "INFO OrderRequest: cart from web"
        sample_expected_labels:
          d_source: web
          d_destination: cart
  - name: AWS/SQS
    logs:
      - function_names: [queue-worker]
        regex_pattern: "(\\w+) .*"
        labels:
          level: "$1"
relabel_configs:
  - source_labels: [__name__, d_operation, d_operation_type]
    regex: "aws_dynamodb_.+;(.+);(.+)"
    target_label: asserts_request_context
    replacement: "$2-$1"
  - source_labels: [__name__]
    regex: "aws_dynamodb_.*_max"
    action: drop-metric
"#;

#[test]
fn relabel_cases() {
  let config = r"
test_cases:
- metrics:
  - name: aws_dynamodb_successful_request_latency_avg
    labels:
      d_operation: get
      d_operation_type: read
    expected_labels:
      d_operation: get
      d_operation_type: read
      asserts_request_context: read-get
  - name: aws_dynamodb_successful_request_latency_max
    labels:
      d_operation: get
    dropped: true
  - name: aws_lambda_invocations_sum
    labels:
      d_function_name: checkout
";

  run(config, Some(SCRAPE_CONFIG)).unwrap();
}

#[test]
fn inline_relabel_cases() {
  let config = r"
test_cases:
- relabel_configs:
  - source_labels: [d_queue_name]
    regex: 'orders-.*'
    action: drop-metric
  metrics:
  - name: aws_sqs_number_of_messages_sent_sum
    labels:
      d_queue_name: orders-eu
    dropped: true
  - name: aws_dynamodb_successful_request_latency_max
    labels:
      d_queue_name: billing
";

  run(config, None).unwrap();
}

#[test]
fn log_cases() {
  let config = r"
test_cases:
- namespace: AWS/Lambda
  logs:
  - function_name: checkout-handler
    line: 'INFO OrderRequest: payment from mobile'
    expected_labels:
      d_source: mobile
      d_destination: payment
  - function_name: checkout-handler
    line: 'START RequestId: 1234'
  - function_name: queue-worker
    line: 'ERROR boom'
- logs:
  - function_name: queue-worker
    line: 'ERROR boom'
    expected_labels:
      d_level: ERROR
- namespace: AWS/Custom
  log_rules:
  - function_names: [inline]
    regex_pattern: 'took (\d+)ms'
    labels:
      duration: '$1'
  logs:
  - function_name: inline
    line: 'took 12ms'
    expected_labels:
      d_duration: '12'
";

  run(config, Some(SCRAPE_CONFIG)).unwrap();
}

#[test]
fn failing_relabel_case() {
  let config = r"
test_cases:
- metrics:
  - name: aws_dynamodb_successful_request_latency_max
    labels:
      d_operation: get
";

  assert_eq!(
    "metric 'aws_dynamodb_successful_request_latency_max' was unexpectedly dropped",
    run(config, Some(SCRAPE_CONFIG)).unwrap_err().to_string()
  );

  let config = r"
test_cases:
- metrics:
  - name: aws_dynamodb_successful_request_latency_avg
    labels:
      d_operation: get
    dropped: true
";
  assert!(
    run(config, Some(SCRAPE_CONFIG))
      .unwrap_err()
      .to_string()
      .starts_with("expected metric 'aws_dynamodb_successful_request_latency_avg' to be dropped")
  );
}

#[test]
fn failing_log_case() {
  let config = r"
test_cases:
- logs:
  - function_name: checkout-handler
    line: 'INFO OrderRequest: payment from mobile'
    expected_labels:
      d_source: web
";

  assert!(
    run(config, Some(SCRAPE_CONFIG))
      .unwrap_err()
      .to_string()
      .starts_with(
        "log line 'INFO OrderRequest: payment from mobile' of function 'checkout-handler' \
         produced unexpected labels"
      )
  );
}

#[test]
fn missing_scrape_config() {
  let config = r"
test_cases:
- metrics:
  - name: foo
";

  assert_eq!(
    "omitting relabel_configs requires passing a scrape config via --scrape-config",
    run(config, None).unwrap_err().to_string()
  );

  let config = r"
test_cases:
- namespace: AWS/S3
  logs:
  - function_name: foo
    line: bar
";
  assert_eq!(
    "no namespace named 'AWS/S3' found in scrape config",
    run(config, Some(SCRAPE_CONFIG)).unwrap_err().to_string()
  );
}

#[test]
fn check_only() {
  let rules = check(SCRAPE_CONFIG).unwrap();
  assert_eq!(2, rules.namespaces().len());
  assert!(rules.soft_invalidations().is_empty());

  let error = check("scrape_interval: 61").unwrap_err().to_string();
  assert!(error.starts_with("invalid configuration (1 violation(s)): scrape_config:"));
}
