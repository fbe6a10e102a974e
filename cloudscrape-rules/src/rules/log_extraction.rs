// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./log_extraction_test.rs"]
mod log_extraction_test;

use crate::config::LogScrapeConfig;
use crate::labels::{DIMENSION_LABEL_PREFIX, Labels};
use crate::pattern::compile_full_match;
use crate::template::CaptureTemplate;
use crate::validate::{Problems, Violation};
use regex::Regex;
use std::collections::BTreeSet;

//
// LogExtractionRule
//

/// Turns matching log lines of selected functions into label sets. A rule whose sample line does
/// not reproduce its expected labels is kept but marked invalid so the rest of the configuration
/// can still load.
#[derive(Debug)]
pub struct LogExtractionRule {
  entity: String,
  function_name_regex: Option<Regex>,
  function_names: BTreeSet<String>,
  log_filter_pattern: Option<String>,
  regex: Regex,
  labels: Vec<(String, CaptureTemplate)>,
  valid: bool,
}

impl LogExtractionRule {
  pub(crate) fn new(config: &LogScrapeConfig, entity: String) -> Result<Self, Violation> {
    let mut problems = Problems::new(entity.clone());

    let function_name_regex = match config.lambda_function_name.as_deref() {
      Some(pattern) if !pattern.is_empty() => match compile_full_match(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
          problems.push(format!("lambda_function_name: {e}"));
          None
        },
      },
      _ => None,
    };
    problems.check(
      config.lambda_function_name.as_deref().is_some_and(|p| !p.is_empty())
        || !config.function_names.is_empty(),
      "either lambda_function_name or function_names is required",
    );

    let regex = match config.regex_pattern.as_deref() {
      Some(pattern) if !pattern.is_empty() => match compile_full_match(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
          problems.push(format!("regex_pattern: {e}"));
          None
        },
      },
      _ => {
        problems.push("regex_pattern is required");
        None
      },
    };

    let Some(regex) = regex else {
      return Err(problems.into_violation());
    };
    let labels = config
      .labels
      .iter()
      .map(|(name, template)| {
        (
          format!("{DIMENSION_LABEL_PREFIX}{name}"),
          CaptureTemplate::parse(template, regex.captures_len()),
        )
      })
      .collect();

    let mut rule = problems.finish(Self {
      entity,
      function_name_regex,
      function_names: config.function_names.clone(),
      log_filter_pattern: config.log_filter_pattern.clone(),
      regex,
      labels,
      valid: true,
    })?;
    rule.initialize(config);
    Ok(rule)
  }

  // Run the rule against its sample line, if it has one, and mark it invalid when the output does
  // not equal the expected labels exactly.
  fn initialize(&mut self, config: &LogScrapeConfig) {
    let (Some(sample), Some(expected)) = (
      config.sample_log_message.as_deref(),
      config.sample_expected_labels.as_ref(),
    ) else {
      return;
    };

    let actual = self.extract(sample);
    if &actual != expected {
      log::warn!(
        "{}: sample log message produced {actual:?}, expected {expected:?}. Rule disabled",
        self.entity
      );
      self.valid = false;
    }
  }

  #[must_use]
  pub const fn is_valid(&self) -> bool {
    self.valid
  }

  #[must_use]
  pub fn entity(&self) -> &str {
    &self.entity
  }

  // Opaque filter passed to the log API, never interpreted here.
  #[must_use]
  pub fn log_filter_pattern(&self) -> Option<&str> {
    self.log_filter_pattern.as_deref()
  }

  #[must_use]
  pub fn should_scrape(&self, function_name: &str) -> bool {
    (self.valid
      && self
        .function_name_regex
        .as_ref()
        .is_some_and(|regex| regex.is_match(function_name)))
      || self.function_names.contains(function_name)
  }

  // Labels for a log line, or an empty set when the trimmed line does not match.
  #[must_use]
  pub fn extract(&self, line: &str) -> Labels {
    let Some(captures) = self.regex.captures(line.trim()) else {
      return Labels::new();
    };

    self
      .labels
      .iter()
      .map(|(name, template)| (name.clone(), template.render(&captures)))
      .collect()
  }
}
