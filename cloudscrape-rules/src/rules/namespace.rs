// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./namespace_test.rs"]
mod namespace_test;

use super::log_extraction::LogExtractionRule;
use crate::config::{MetricConfig, NamespaceConfig, ScrapeConfig};
use crate::pattern::PatternMatcher;
use crate::validate::{Problems, Violation, ViolationCollector};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

//
// Statistic
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statistic {
  Sum,
  Average,
  Maximum,
  Minimum,
  SampleCount,
  // Extended statistic such as p99 or p99.9, stored as the raw percentile text.
  Percentile(String),
}

impl Statistic {
  // Suffix used when naming the series for this statistic.
  #[must_use]
  pub fn suffix(&self) -> String {
    match self {
      Self::Sum => "sum".to_string(),
      Self::Average => "avg".to_string(),
      Self::Maximum => "max".to_string(),
      Self::Minimum => "min".to_string(),
      Self::SampleCount => "samples".to_string(),
      Self::Percentile(percentile) => format!("p{}", percentile.replace('.', "_")),
    }
  }
}

impl FromStr for Statistic {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Sum" => Ok(Self::Sum),
      "Average" => Ok(Self::Average),
      "Maximum" => Ok(Self::Maximum),
      "Minimum" => Ok(Self::Minimum),
      "SampleCount" => Ok(Self::SampleCount),
      _ => s
        .strip_prefix('p')
        .filter(|percentile| {
          percentile
            .parse::<f64>()
            .is_ok_and(|value| value > 0.0 && value < 100.0)
            && percentile.chars().all(|c| c.is_ascii_digit() || c == '.')
        })
        .map(|percentile| Self::Percentile(percentile.to_string()))
        .ok_or_else(|| format!("unknown statistic '{s}'")),
    }
  }
}

impl fmt::Display for Statistic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Sum => f.write_str("Sum"),
      Self::Average => f.write_str("Average"),
      Self::Maximum => f.write_str("Maximum"),
      Self::Minimum => f.write_str("Minimum"),
      Self::SampleCount => f.write_str("SampleCount"),
      Self::Percentile(percentile) => write!(f, "p{percentile}"),
    }
  }
}

//
// MetricRules
//

/// A metric selected for scraping, with interval and period already resolved through the
/// namespace and global defaults.
#[derive(Debug)]
pub struct MetricRules {
  name: String,
  interval: Duration,
  period: Duration,
  statistics: Vec<Statistic>,
}

impl MetricRules {
  pub(crate) fn new(
    config: &MetricConfig,
    namespace: &NamespaceConfig,
    root: &ScrapeConfig,
    entity: String,
  ) -> Result<Self, Violation> {
    let mut problems = Problems::new(entity);
    problems.check(!config.name.is_empty(), "name is required");
    problems.check_seconds("scrape_interval", config.scrape_interval);
    problems.check_seconds("period", config.period);
    problems.check(!config.stats.is_empty(), "at least one statistic is required");

    let statistics = config
      .stats
      .iter()
      .filter_map(|stat| match stat.parse::<Statistic>() {
        Ok(statistic) => Some(statistic),
        Err(e) => {
          problems.push(e);
          None
        },
      })
      .collect();

    problems.finish(Self {
      name: config.name.clone(),
      interval: seconds(config.effective_interval(namespace, root)),
      period: seconds(config.effective_period(namespace, root)),
      statistics,
    })
  }

  #[must_use]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[must_use]
  pub const fn interval(&self) -> Duration {
    self.interval
  }

  #[must_use]
  pub const fn period(&self) -> Duration {
    self.period
  }

  #[must_use]
  pub fn statistics(&self) -> &[Statistic] {
    &self.statistics
  }
}

// Only called on values that passed validation, anything else collapses to zero.
pub(crate) fn seconds(value: i64) -> Duration {
  Duration::from_secs(u64::try_from(value).unwrap_or_default())
}

//
// NamespaceRules
//

#[derive(Debug)]
pub struct NamespaceRules {
  name: String,
  interval: Duration,
  period: Duration,
  dimension_filters: BTreeMap<String, PatternMatcher>,
  tag_filters: BTreeMap<String, BTreeSet<String>>,
  metrics: Vec<MetricRules>,
  metric_index: HashMap<String, usize>,
  log_rules: Vec<LogExtractionRule>,
}

impl NamespaceRules {
  // Compile one namespace. Violations of the namespace itself and of each metric and log rule are
  // reported separately so every broken entity is listed.
  pub(crate) fn new(
    config: &NamespaceConfig,
    root: &ScrapeConfig,
    index: usize,
    collector: &mut ViolationCollector,
  ) -> Option<Self> {
    let entity = format!("namespaces[{index}] ({})", config.name);
    let mut problems = Problems::new(entity.clone());
    problems.check(!config.name.is_empty(), "name is required");
    problems.check_seconds("scrape_interval", config.scrape_interval);
    problems.check_seconds("period", config.period);

    let dimension_filters = config
      .dimension_filters
      .iter()
      .filter_map(|(dimension, pattern)| match PatternMatcher::new(pattern) {
        Ok(matcher) => Some((dimension.clone(), matcher)),
        Err(e) => {
          problems.push(format!("dimension filter '{dimension}': {e}"));
          None
        },
      })
      .collect();

    for (tag, values) in &config.tag_filters {
      problems.check(
        !values.is_empty(),
        &format!("tag filter '{tag}' must list at least one value"),
      );
    }

    let metrics: Vec<_> = config
      .metrics
      .iter()
      .enumerate()
      .filter_map(|(i, metric)| {
        collector.collect(MetricRules::new(
          metric,
          config,
          root,
          format!("{entity}.metrics[{i}] ({})", metric.name),
        ))
      })
      .collect();
    // First declaration wins when a metric is listed twice.
    let mut metric_index = HashMap::new();
    for (i, metric) in metrics.iter().enumerate() {
      metric_index.entry(metric.name.clone()).or_insert(i);
    }

    let log_rules: Vec<_> = config
      .logs
      .iter()
      .enumerate()
      .filter_map(|(i, log)| {
        collector.collect(LogExtractionRule::new(log, format!("{entity}.logs[{i}]")))
      })
      .collect();

    collector.collect(problems.finish(Self {
      name: config.name.clone(),
      interval: seconds(config.effective_interval(root)),
      period: seconds(config.effective_period(root)),
      dimension_filters,
      tag_filters: config.tag_filters.clone(),
      metrics,
      metric_index,
      log_rules,
    }))
  }

  #[must_use]
  pub fn name(&self) -> &str {
    &self.name
  }

  #[must_use]
  pub const fn interval(&self) -> Duration {
    self.interval
  }

  #[must_use]
  pub const fn period(&self) -> Duration {
    self.period
  }

  #[must_use]
  pub fn metrics(&self) -> &[MetricRules] {
    &self.metrics
  }

  #[must_use]
  pub fn metric(&self, name: &str) -> Option<&MetricRules> {
    self.metric_index.get(name).map(|&i| &self.metrics[i])
  }

  #[must_use]
  pub fn log_rules(&self) -> &[LogExtractionRule] {
    &self.log_rules
  }

  #[must_use]
  pub fn dimension_filters(&self) -> &BTreeMap<String, PatternMatcher> {
    &self.dimension_filters
  }

  // Every configured dimension filter must accept the metric's value for that dimension. A missing
  // dimension only passes a NOT_PRESENT filter.
  #[must_use]
  pub fn matches_dimensions(&self, dimensions: &BTreeMap<String, String>) -> bool {
    self
      .dimension_filters
      .iter()
      .all(|(dimension, matcher)| matcher.matches(dimensions.get(dimension).map(String::as_str)))
  }

  // Every configured tag must be present on the resource with one of the allowed values.
  #[must_use]
  pub fn matches_resource_tags(&self, tags: &BTreeMap<String, String>) -> bool {
    self
      .tag_filters
      .iter()
      .all(|(tag, values)| tags.get(tag).is_some_and(|value| values.contains(value)))
  }
}
