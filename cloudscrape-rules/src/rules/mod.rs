// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt


pub mod log_extraction;
pub mod namespace;
pub mod relabel;
pub mod tags;

use self::log_extraction::LogExtractionRule;
use self::namespace::{NamespaceRules, seconds};
use self::relabel::{RelabelOutcome, RelabelRule};
use self::tags::TagFilter;
use crate::config::ScrapeConfig;
use crate::validate::{Problems, ValidationError, Violation, ViolationCollector};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

//
// ScrapeRules
//

/// The compiled, immutable form of a scrape configuration. Every pattern is compiled and every
/// entity validated when this is built, evaluation never compiles or validates anything.
#[derive(Debug)]
pub struct ScrapeRules {
  interval: Duration,
  period: Duration,
  delay: Duration,
  regions: BTreeSet<String>,
  discover_ecs_tasks: bool,
  discover_resource_types: BTreeSet<String>,
  tag_filter: TagFilter,
  namespaces: Vec<NamespaceRules>,
  namespace_index: HashMap<String, usize>,
  relabel_rules: Vec<RelabelRule>,
  soft_invalidations: Vec<Violation>,
}

impl ScrapeRules {
  // Walk the whole tree, compiling everything. All structural problems across the document are
  // returned together, soft invalidations are kept on the result instead.
  pub fn new(config: &ScrapeConfig) -> Result<Self, ValidationError> {
    let mut collector = ViolationCollector::default();

    let mut problems = Problems::new("scrape_config");
    problems.check_seconds("scrape_interval", Some(config.scrape_interval));
    problems.check_seconds("period", Some(config.period));
    problems.check(config.delay >= 0, "delay must not be negative");
    let mut seen = HashSet::new();
    for namespace in &config.namespaces {
      if !namespace.name.is_empty() && !seen.insert(namespace.name.as_str()) {
        problems.push(format!("duplicate namespace '{}'", namespace.name));
      }
    }
    collector.collect(problems.finish(()));

    let tag_filter = config
      .tag_export_config
      .as_ref()
      .and_then(|tag_export_config| collector.collect(TagFilter::new(tag_export_config)))
      .unwrap_or_default();

    let namespaces: Vec<_> = config
      .namespaces
      .iter()
      .enumerate()
      .filter_map(|(i, namespace)| NamespaceRules::new(namespace, config, i, &mut collector))
      .collect();
    let mut namespace_index = HashMap::new();
    for (i, namespace) in namespaces.iter().enumerate() {
      namespace_index.entry(namespace.name().to_string()).or_insert(i);
    }

    let mut soft_invalidations = Vec::new();
    let relabel_rules: Vec<_> = config
      .relabel_configs
      .iter()
      .enumerate()
      .filter_map(|(i, relabel)| {
        match collector.collect(RelabelRule::new(relabel, format!("relabel_configs[{i}]")))? {
          RelabelOutcome::Active(rule) => Some(rule),
          RelabelOutcome::Disabled(violation) => {
            soft_invalidations.push(violation);
            None
          },
        }
      })
      .collect();

    for rule in namespaces
      .iter()
      .flat_map(NamespaceRules::log_rules)
      .filter(|rule| !rule.is_valid())
    {
      soft_invalidations.push(Violation {
        entity: rule.entity().to_string(),
        problems: vec!["sample log message did not produce the expected labels".to_string()],
      });
    }

    let rules = collector.finish(Self {
      interval: seconds(config.scrape_interval),
      period: seconds(config.period),
      delay: seconds(config.delay),
      regions: config.regions.clone(),
      discover_ecs_tasks: config.discover_ecs_tasks,
      discover_resource_types: config.discover_resource_types.clone(),
      tag_filter,
      namespaces,
      namespace_index,
      relabel_rules,
      soft_invalidations,
    })?;
    log::info!(
      "compiled {} namespace(s) and {} relabel rule(s), {} rule(s) disabled",
      rules.namespaces.len(),
      rules.relabel_rules.len(),
      rules.soft_invalidations.len()
    );
    Ok(rules)
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
  pub const fn delay(&self) -> Duration {
    self.delay
  }

  #[must_use]
  pub const fn regions(&self) -> &BTreeSet<String> {
    &self.regions
  }

  #[must_use]
  pub const fn discover_ecs_tasks(&self) -> bool {
    self.discover_ecs_tasks
  }

  #[must_use]
  pub const fn discover_resource_types(&self) -> &BTreeSet<String> {
    &self.discover_resource_types
  }

  #[must_use]
  pub const fn tag_filter(&self) -> &TagFilter {
    &self.tag_filter
  }

  #[must_use]
  pub fn namespaces(&self) -> &[NamespaceRules] {
    &self.namespaces
  }

  #[must_use]
  pub fn namespace(&self, name: &str) -> Option<&NamespaceRules> {
    self
      .namespace_index
      .get(name)
      .map(|&i| &self.namespaces[i])
  }

  #[must_use]
  pub fn relabel_rules(&self) -> &[RelabelRule] {
    &self.relabel_rules
  }

  // Valid log rules across all namespaces, in declaration order.
  pub fn log_rules(&self) -> impl Iterator<Item = &LogExtractionRule> {
    self
      .namespaces
      .iter()
      .flat_map(NamespaceRules::log_rules)
      .filter(|rule| rule.is_valid())
  }

  // Rules that were excluded from evaluation without failing the load.
  #[must_use]
  pub fn soft_invalidations(&self) -> &[Violation] {
    &self.soft_invalidations
  }
}
