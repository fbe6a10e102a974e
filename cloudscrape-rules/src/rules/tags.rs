// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./tags_test.rs"]
mod tags_test;

use crate::config::TagExportConfig;
use crate::pattern::compile_full_match;
use crate::validate::{Problems, Violation};
use regex::Regex;
use std::collections::BTreeSet;

//
// TagFilter
//

/// Decides which resource tags are exported as labels. Exclusion always wins over inclusion, and
/// configuring any include turns the filter into an allow-list.
#[derive(Debug, Default)]
pub struct TagFilter {
  include_tags: BTreeSet<String>,
  include_patterns: Vec<Regex>,
  exclude_tags: BTreeSet<String>,
  exclude_patterns: Vec<Regex>,
}

impl TagFilter {
  pub fn new(config: &TagExportConfig) -> Result<Self, Violation> {
    let mut problems = Problems::new("tag_export_config");
    let mut compile = |field: &str, patterns: &BTreeSet<String>| -> Vec<Regex> {
      patterns
        .iter()
        .filter_map(|pattern| match compile_full_match(pattern) {
          Ok(regex) => Some(regex),
          Err(e) => {
            problems.push(format!("{field}: {e}"));
            None
          },
        })
        .collect()
    };

    let include_patterns = compile("include_patterns", &config.include_patterns);
    let exclude_patterns = compile("exclude_patterns", &config.exclude_patterns);
    problems.finish(Self {
      include_tags: config.include_tags.clone(),
      include_patterns,
      exclude_tags: config.exclude_tags.clone(),
      exclude_patterns,
    })
  }

  // The value is accepted for symmetry with the resource tag model, only the name is filtered.
  #[must_use]
  pub fn should_export(&self, tag_name: &str, _tag_value: &str) -> bool {
    let wanted = (self.include_tags.is_empty() && self.include_patterns.is_empty())
      || self.include_tags.contains(tag_name)
      || self
        .include_patterns
        .iter()
        .any(|regex| regex.is_match(tag_name));

    wanted
      && !self.exclude_tags.contains(tag_name)
      && !self
        .exclude_patterns
        .iter()
        .any(|regex| regex.is_match(tag_name))
  }
}
