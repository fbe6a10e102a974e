// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt


use crate::labels::{
  ACCOUNT_ID_LABEL,
  FUNCTION_NAME_LABEL,
  Labels,
  NAMESPACE_LABEL,
  REGION_LABEL,
  dimension_label,
  series_name,
  tag_label,
};
use crate::rules::ScrapeRules;
use crate::rules::namespace::{MetricRules, NamespaceRules};
use bd_log::warn_every;
use bd_server_stats::stats::Scope;
use prometheus::IntCounter;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use time::ext::NumericalDuration;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScrapeError {
  #[error("metric has no namespace")]
  MissingNamespace,
  #[error("metric in namespace {0} has no name")]
  MissingMetricName(String),
}

//
// RawMetric
//

/// A metric as listed by the cloud API, before any rules are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetric {
  pub namespace: String,
  pub metric_name: String,
  pub dimensions: BTreeMap<String, String>,
  pub tags: BTreeMap<String, String>,
}

//
// Series
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
  pub name: String,
  pub labels: Labels,
}

//
// SeriesSink
//

/// Receives accepted series, typically the exposition layer.
#[cfg_attr(test, mockall::automock)]
pub trait SeriesSink: Send + Sync {
  fn emit(&self, series: Vec<Series>);
}

//
// PipelineStats
//

#[derive(Clone)]
struct PipelineStats {
  dimension_rejected: IntCounter,
  tag_rejected: IntCounter,
  relabel_dropped: IntCounter,
  malformed_input: IntCounter,
  log_unmatched: IntCounter,
  log_extracted: IntCounter,
}

impl PipelineStats {
  fn new(scope: &Scope) -> Self {
    let scope = scope.scope("pipeline");
    Self {
      dimension_rejected: scope.counter("dimension_rejected"),
      tag_rejected: scope.counter("tag_rejected"),
      relabel_dropped: scope.counter("relabel_dropped"),
      malformed_input: scope.counter("malformed_input"),
      log_unmatched: scope.counter("log_unmatched"),
      log_extracted: scope.counter("log_extracted"),
    }
  }
}

//
// LabelPipeline
//

/// Evaluates compiled rules for scraped metrics and log lines. The pipeline only reads the rules it
/// was built with, so a single instance can be shared by any number of scrape workers.
pub struct LabelPipeline {
  rules: Arc<ScrapeRules>,
  stats: PipelineStats,
}

impl LabelPipeline {
  #[must_use]
  pub fn new(rules: Arc<ScrapeRules>, scope: &Scope) -> Self {
    Self {
      rules,
      stats: PipelineStats::new(scope),
    }
  }

  // A pipeline for a newer configuration snapshot, sharing this pipeline's counters.
  #[must_use]
  pub fn with_rules(&self, rules: Arc<ScrapeRules>) -> Self {
    Self {
      rules,
      stats: self.stats.clone(),
    }
  }

  #[must_use]
  pub const fn rules(&self) -> &Arc<ScrapeRules> {
    &self.rules
  }

  // Resolve the namespace and metric rules, rejecting metrics nothing is configured for or whose
  // dimensions or resource tags fail the namespace filters.
  fn select<'a>(
    &'a self,
    metric: &RawMetric,
  ) -> Result<Option<(&'a NamespaceRules, &'a MetricRules)>, ScrapeError> {
    if metric.namespace.is_empty() {
      return Err(ScrapeError::MissingNamespace);
    }
    if metric.metric_name.is_empty() {
      return Err(ScrapeError::MissingMetricName(metric.namespace.clone()));
    }

    let Some((namespace, metric_rules)) = self
      .rules
      .namespace(&metric.namespace)
      .and_then(|namespace| Some((namespace, namespace.metric(&metric.metric_name)?)))
    else {
      log::trace!(
        "no rules for {}/{}",
        metric.namespace,
        metric.metric_name
      );
      return Ok(None);
    };

    if !namespace.matches_dimensions(&metric.dimensions) {
      log::trace!("dimension filters rejected {metric:?}");
      self.stats.dimension_rejected.inc();
      return Ok(None);
    }
    if !namespace.matches_resource_tags(&metric.tags) {
      log::trace!("tag filters rejected {metric:?}");
      self.stats.tag_rejected.inc();
      return Ok(None);
    }

    Ok(Some((namespace, metric_rules)))
  }

  // Region, namespace, snake cased dimensions and the exported resource tags.
  #[must_use]
  pub fn base_labels(&self, region: &str, metric: &RawMetric) -> Labels {
    let mut labels = Labels::new();
    labels.insert(REGION_LABEL.to_string(), region.to_string());
    labels.insert(NAMESPACE_LABEL.to_string(), metric.namespace.clone());
    for (dimension, value) in &metric.dimensions {
      labels.insert(dimension_label(dimension), value.clone());
    }

    let tag_filter = self.rules.tag_filter();
    for (tag, value) in &metric.tags {
      if tag_filter.should_export(tag, value) {
        labels.insert(tag_label(tag), value.clone());
      }
    }
    labels
  }

  // Apply every relabel rule in order. A drop short circuits the series, a replace feeds its output
  // to the next rule. Returns None when the series must not be emitted.
  #[must_use]
  pub fn relabel(&self, metric_name: &str, labels: Labels) -> Option<Labels> {
    let mut labels = labels;
    for rule in self.rules.relabel_rules() {
      if rule.should_drop(metric_name, &labels) {
        log::debug!("relabel rule dropped {metric_name} {labels:?}");
        self.stats.relabel_dropped.inc();
        return None;
      }
      if let std::borrow::Cow::Owned(relabeled) = rule.apply(metric_name, &labels) {
        labels = relabeled;
      }
    }
    Some(labels)
  }

  // One series per configured statistic. An empty result means the metric was rejected or every
  // series was dropped.
  pub fn evaluate_metric(&self, region: &str, metric: &RawMetric) -> Result<Vec<Series>, ScrapeError> {
    let Some((namespace, metric_rules)) = self.select(metric)? else {
      return Ok(Vec::new());
    };

    let base = self.base_labels(region, metric);
    Ok(
      metric_rules
        .statistics()
        .iter()
        .filter_map(|statistic| {
          let name = series_name(namespace.name(), metric_rules.name(), &statistic.suffix());
          self
            .relabel(&name, base.clone())
            .map(|labels| Series { name, labels })
        })
        .collect(),
    )
  }

  // Evaluate a whole scrape batch. A malformed metric is logged and skipped, the rest of the batch
  // is still emitted.
  pub fn process_metrics(&self, region: &str, metrics: &[RawMetric], sink: &dyn SeriesSink) {
    let mut series = Vec::new();
    for metric in metrics {
      match self.evaluate_metric(region, metric) {
        Ok(evaluated) => series.extend(evaluated),
        Err(e) => {
          warn_every!(15.seconds(), "skipping malformed metric in {}: {}", region, e);
          self.stats.malformed_input.inc();
        },
      }
    }

    log::debug!("emitting {} series for {region}", series.len());
    if !series.is_empty() {
      sink.emit(series);
    }
  }

  // Labels for a log line of a function. The first valid rule selecting the function decides,
  // relabel rules are not applied to log derived labels.
  #[must_use]
  pub fn evaluate_log(
    &self,
    account_id: &str,
    region: &str,
    function_name: &str,
    line: &str,
  ) -> Option<Labels> {
    let rule = self
      .rules
      .log_rules()
      .find(|rule| rule.should_scrape(function_name))?;

    let mut labels = rule.extract(line);
    if labels.is_empty() {
      self.stats.log_unmatched.inc();
      return None;
    }

    labels.insert(ACCOUNT_ID_LABEL.to_string(), account_id.to_string());
    labels.insert(REGION_LABEL.to_string(), region.to_string());
    labels.insert(FUNCTION_NAME_LABEL.to_string(), function_name.to_string());
    self.stats.log_extracted.inc();
    Some(labels)
  }
}
