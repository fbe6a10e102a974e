// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt


use crate::rules::ScrapeRules;
use crate::validate::ValidationError;
use cloudscrape_common::env;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SCRAPE_INTERVAL_SECONDS: i64 = 60;
pub const DEFAULT_PERIOD_SECONDS: i64 = 60;

pub const REGIONS_ENV: &str = "REGIONS";
pub const ENABLE_ECS_SD_ENV: &str = "ENABLE_ECS_SD";
pub const DEFAULT_RELABEL_RULES_ENV: &str = "DEFAULT_RELABEL_RULES";

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("io error reading {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("configuration is not valid UTF-8: {0}")]
  Utf8(#[from] std::str::Utf8Error),
  #[error("configuration is not valid YAML: {0}")]
  Yaml(#[from] serde_yaml::Error),
  #[error(transparent)]
  Validation(#[from] ValidationError),
}

//
// ScrapeConfig
//

/// Root of the scrape configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
  pub scrape_interval: i64,
  pub period: i64,
  pub delay: i64,
  pub regions: BTreeSet<String>,
  pub discover_ecs_tasks: bool,
  pub discover_resource_types: BTreeSet<String>,
  pub tag_export_config: Option<TagExportConfig>,
  pub namespaces: Vec<NamespaceConfig>,
  pub relabel_configs: Vec<RelabelConfig>,
}

impl Default for ScrapeConfig {
  fn default() -> Self {
    Self {
      scrape_interval: DEFAULT_SCRAPE_INTERVAL_SECONDS,
      period: DEFAULT_PERIOD_SECONDS,
      delay: 0,
      regions: BTreeSet::new(),
      discover_ecs_tasks: false,
      discover_resource_types: BTreeSet::new(),
      tag_export_config: None,
      namespaces: Vec::new(),
      relabel_configs: Vec::new(),
    }
  }
}

impl ScrapeConfig {
  pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
    Ok(serde_yaml::from_str(yaml)?)
  }
}

//
// NamespaceConfig
//

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NamespaceConfig {
  pub name: String,
  pub scrape_interval: Option<i64>,
  pub period: Option<i64>,
  pub dimension_filters: BTreeMap<String, String>,
  pub tag_filters: BTreeMap<String, BTreeSet<String>>,
  pub metrics: Vec<MetricConfig>,
  pub logs: Vec<LogScrapeConfig>,
}

impl NamespaceConfig {
  #[must_use]
  pub fn effective_interval(&self, root: &ScrapeConfig) -> i64 {
    self.scrape_interval.unwrap_or(root.scrape_interval)
  }

  #[must_use]
  pub fn effective_period(&self, root: &ScrapeConfig) -> i64 {
    self.period.unwrap_or(root.period)
  }
}

//
// MetricConfig
//

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
  pub name: String,
  pub scrape_interval: Option<i64>,
  pub period: Option<i64>,
  pub stats: BTreeSet<String>,
}

impl MetricConfig {
  // Metric override, then namespace override, then the global default.
  #[must_use]
  pub fn effective_interval(&self, namespace: &NamespaceConfig, root: &ScrapeConfig) -> i64 {
    self
      .scrape_interval
      .unwrap_or_else(|| namespace.effective_interval(root))
  }

  #[must_use]
  pub fn effective_period(&self, namespace: &NamespaceConfig, root: &ScrapeConfig) -> i64 {
    self
      .period
      .unwrap_or_else(|| namespace.effective_period(root))
  }
}

//
// TagExportConfig
//

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TagExportConfig {
  pub include_tags: BTreeSet<String>,
  pub include_patterns: BTreeSet<String>,
  pub exclude_tags: BTreeSet<String>,
  pub exclude_patterns: BTreeSet<String>,
}

//
// LogScrapeConfig
//

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogScrapeConfig {
  pub lambda_function_name: Option<String>,
  pub function_names: BTreeSet<String>,
  pub log_filter_pattern: Option<String>,
  pub regex_pattern: Option<String>,
  pub labels: BTreeMap<String, String>,
  pub sample_log_message: Option<String>,
  pub sample_expected_labels: Option<BTreeMap<String, String>>,
}

//
// RelabelConfig
//

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelabelConfig {
  pub source_labels: Vec<String>,
  pub regex: Option<String>,
  pub target_label: Option<String>,
  pub replacement: Option<String>,
  pub action: Option<String>,
}

// Shape of a standalone relabel rule file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RelabelRulesFile {
  relabel_configs: Vec<RelabelConfig>,
}

//
// ScrapeConfigOverrides
//

/// Environment-driven overrides, applied after parsing and before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeConfigOverrides {
  pub regions: Option<Vec<String>>,
  pub discover_ecs_tasks: Option<bool>,
  pub default_relabel_rules: Option<PathBuf>,
}

impl ScrapeConfigOverrides {
  #[must_use]
  pub fn from_env() -> Self {
    Self {
      regions: env::var(REGIONS_ENV).map(|regions| env::split_list(&regions)),
      discover_ecs_tasks: env::var(ENABLE_ECS_SD_ENV).map(|flag| env::is_truthy(&flag)),
      default_relabel_rules: env::var(DEFAULT_RELABEL_RULES_ENV).map(PathBuf::from),
    }
  }

  pub fn apply(&self, config: &mut ScrapeConfig) -> Result<(), ConfigError> {
    if let Some(regions) = &self.regions {
      log::info!("overriding regions with {regions:?}");
      config.regions = regions.iter().cloned().collect();
    }

    if let Some(discover_ecs_tasks) = self.discover_ecs_tasks {
      config.discover_ecs_tasks = discover_ecs_tasks;
    }

    if let Some(path) = &self.default_relabel_rules {
      let rules: RelabelRulesFile = serde_yaml::from_str(&read_file(path)?)?;
      log::info!(
        "appending {} default relabel rule(s) from {}",
        rules.relabel_configs.len(),
        path.display()
      );
      config.relabel_configs.extend(rules.relabel_configs);
    }

    Ok(())
  }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
  std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
    path: path.display().to_string(),
    source,
  })
}

// Parse, apply overrides, then validate and compile. Nothing is returned unless the whole document
// is valid.
pub fn load_from_str(
  yaml: &str,
  overrides: &ScrapeConfigOverrides,
) -> Result<ScrapeRules, ConfigError> {
  let mut config = ScrapeConfig::from_yaml(yaml)?;
  overrides.apply(&mut config)?;
  Ok(ScrapeRules::new(&config)?)
}

pub fn load_from_file(
  path: impl AsRef<Path>,
  overrides: &ScrapeConfigOverrides,
) -> Result<ScrapeRules, ConfigError> {
  load_from_str(&read_file(path.as_ref())?, overrides)
}
