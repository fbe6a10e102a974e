// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
mod test;

use anyhow::{Context, anyhow, bail};
use bd_server_stats::stats::Collector;
use cloudscrape_rules::config::{LogScrapeConfig, NamespaceConfig, RelabelConfig, ScrapeConfig};
use cloudscrape_rules::labels::{ACCOUNT_ID_LABEL, FUNCTION_NAME_LABEL, Labels, REGION_LABEL};
use cloudscrape_rules::pipeline::LabelPipeline;
use cloudscrape_rules::rules::ScrapeRules;
use pretty_assertions::Comparison;
use serde::Deserialize;
use std::sync::Arc;

const TEST_ACCOUNT_ID: &str = "000000000000";
const TEST_REGION: &str = "test-region";
const INLINE_NAMESPACE: &str = "inline";

#[ctor::ctor]
fn global_init() {
  bd_log::SwapLogger::initialize();
}

//
// TesterConfig
//

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TesterConfig {
  test_cases: Vec<TestCase>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TestCase {
  // Relabel rules for the metric cases, the scrape config's rules when absent.
  relabel_configs: Option<Vec<RelabelConfig>>,
  metrics: Vec<MetricCase>,
  // Restricts log cases to the log rules of one scrape config namespace.
  namespace: Option<String>,
  // Inline log rules for the log cases, the scrape config's rules when absent.
  log_rules: Option<Vec<LogScrapeConfig>>,
  logs: Vec<LogCase>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetricCase {
  name: String,
  labels: Labels,
  // Defaults to the input labels, i.e. no change.
  expected_labels: Option<Labels>,
  dropped: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LogCase {
  function_name: String,
  line: String,
  // Empty means the line must not produce labels.
  expected_labels: Labels,
}

fn compile(config: &ScrapeConfig) -> anyhow::Result<LabelPipeline> {
  let rules = check_config(config)?;
  Ok(LabelPipeline::new(
    Arc::new(rules),
    &Collector::default().scope("test"),
  ))
}

fn require_scrape_config<'a>(
  field_name: &str,
  scrape_config: Option<&'a ScrapeConfig>,
) -> anyhow::Result<&'a ScrapeConfig> {
  scrape_config.ok_or_else(|| {
    anyhow!("omitting {field_name} requires passing a scrape config via --scrape-config")
  })
}

fn relabel_pipeline(
  test_case: &TestCase,
  scrape_config: Option<&ScrapeConfig>,
) -> anyhow::Result<LabelPipeline> {
  let relabel_configs = match &test_case.relabel_configs {
    Some(relabel_configs) => relabel_configs.clone(),
    None => require_scrape_config("relabel_configs", scrape_config)?
      .relabel_configs
      .clone(),
  };
  compile(&ScrapeConfig {
    relabel_configs,
    ..Default::default()
  })
}

fn log_pipeline(
  test_case: &TestCase,
  scrape_config: Option<&ScrapeConfig>,
) -> anyhow::Result<LabelPipeline> {
  let namespaces = match (&test_case.log_rules, &test_case.namespace) {
    (Some(log_rules), namespace) => vec![NamespaceConfig {
      name: namespace.clone().unwrap_or_else(|| INLINE_NAMESPACE.to_string()),
      logs: log_rules.clone(),
      ..Default::default()
    }],
    (None, namespace) => {
      let scrape_config = require_scrape_config("log_rules", scrape_config)?;
      let namespaces: Vec<_> = scrape_config
        .namespaces
        .iter()
        .filter(|candidate| namespace.as_ref().is_none_or(|name| &candidate.name == name))
        .cloned()
        .collect();
      if let Some(namespace) = namespace
        && namespaces.is_empty()
      {
        bail!("no namespace named '{namespace}' found in scrape config");
      }
      namespaces
    },
  };

  compile(&ScrapeConfig {
    namespaces,
    ..Default::default()
  })
}

fn run_metric_cases(
  test_case: &TestCase,
  scrape_config: Option<&ScrapeConfig>,
) -> anyhow::Result<usize> {
  if test_case.metrics.is_empty() {
    return Ok(0);
  }

  let pipeline = relabel_pipeline(test_case, scrape_config)?;
  for metric in &test_case.metrics {
    let result = pipeline.relabel(&metric.name, metric.labels.clone());
    match (result, metric.dropped) {
      (None, true) => {},
      (None, false) => bail!("metric '{}' was unexpectedly dropped", metric.name),
      (Some(labels), true) => bail!(
        "expected metric '{}' to be dropped but it was kept with labels {labels:?}",
        metric.name
      ),
      (Some(labels), false) => {
        let expected = metric.expected_labels.as_ref().unwrap_or(&metric.labels);
        if expected != &labels {
          bail!(
            "relabeling metric '{}' produced unexpected labels: {}",
            metric.name,
            Comparison::new(expected, &labels)
          );
        }
      },
    }
  }

  Ok(test_case.metrics.len())
}

fn run_log_cases(
  test_case: &TestCase,
  scrape_config: Option<&ScrapeConfig>,
) -> anyhow::Result<usize> {
  if test_case.logs.is_empty() {
    return Ok(0);
  }

  let pipeline = log_pipeline(test_case, scrape_config)?;
  for log in &test_case.logs {
    let mut labels = pipeline
      .evaluate_log(TEST_ACCOUNT_ID, TEST_REGION, &log.function_name, &log.line)
      .unwrap_or_default();
    for context_label in [ACCOUNT_ID_LABEL, REGION_LABEL, FUNCTION_NAME_LABEL] {
      labels.remove(context_label);
    }

    if log.expected_labels != labels {
      bail!(
        "log line '{}' of function '{}' produced unexpected labels: {}",
        log.line,
        log.function_name,
        Comparison::new(&log.expected_labels, &labels)
      );
    }
  }

  Ok(test_case.logs.len())
}

fn check_config(config: &ScrapeConfig) -> anyhow::Result<ScrapeRules> {
  let rules = ScrapeRules::new(config)?;
  for violation in rules.soft_invalidations() {
    log::warn!("rule disabled: {violation}");
  }
  log::info!(
    "scrape config is valid: {} namespace(s), {} relabel rule(s), {} disabled rule(s)",
    rules.namespaces().len(),
    rules.relabel_rules().len(),
    rules.soft_invalidations().len()
  );
  Ok(rules)
}

// Validate a scrape config without running anything. Disabled rules are reported but do not fail
// the check.
pub fn check(scrape_config: &str) -> anyhow::Result<ScrapeRules> {
  check_config(&ScrapeConfig::from_yaml(scrape_config).context("invalid scrape config")?)
}

pub fn run(config: &str, scrape_config: Option<&str>) -> anyhow::Result<()> {
  let config: TesterConfig = serde_yaml::from_str(config).context("invalid test config")?;
  let scrape_config = scrape_config
    .map(|scrape_config| -> anyhow::Result<ScrapeConfig> {
      let scrape_config = ScrapeConfig::from_yaml(scrape_config).context("invalid scrape config")?;
      check_config(&scrape_config)?;
      Ok(scrape_config)
    })
    .transpose()?;

  let num_test_cases = config.test_cases.len();
  let mut num_metrics = 0;
  let mut num_logs = 0;
  for test_case in &config.test_cases {
    num_metrics += run_metric_cases(test_case, scrape_config.as_ref())?;
    num_logs += run_log_cases(test_case, scrape_config.as_ref())?;
  }
  log::info!(
    "processed {num_test_cases} test case(s), {num_metrics} test metric(s) and {num_logs} test \
     log line(s)"
  );

  Ok(())
}
