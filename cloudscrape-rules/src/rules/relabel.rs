// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./relabel_test.rs"]
mod relabel_test;

use crate::config::RelabelConfig;
use crate::labels::{Labels, METRIC_NAME_LABEL};
use crate::pattern::compile_full_match;
use crate::template::CaptureTemplate;
use crate::validate::{Problems, Violation};
use itertools::Itertools;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;

const SOURCE_LABEL_SEPARATOR: &str = ";";

//
// RelabelAction
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelabelAction {
  Replace {
    target_label: String,
    replacement: CaptureTemplate,
  },
  DropMetric,
}

impl fmt::Display for RelabelAction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Replace { .. } => f.write_str("replace"),
      Self::DropMetric => f.write_str("drop-metric"),
    }
  }
}

//
// RelabelOutcome
//

/// Result of compiling a relabel rule. An unrecognized action does not fail the configuration, the
/// rule is reported and left out of evaluation.
#[derive(Debug)]
pub enum RelabelOutcome {
  Active(RelabelRule),
  Disabled(Violation),
}

//
// RelabelRule
//

#[derive(Debug)]
pub struct RelabelRule {
  source_labels: Vec<String>,
  regex: Regex,
  action: RelabelAction,
}

impl RelabelRule {
  pub(crate) fn new(config: &RelabelConfig, entity: String) -> Result<RelabelOutcome, Violation> {
    let mut problems = Problems::new(entity);
    problems.check(
      !config.source_labels.is_empty(),
      "at least one source label is required",
    );
    problems.check(
      config.source_labels.iter().all(|label| !label.is_empty()),
      "source labels must not be empty",
    );

    let regex = match config.regex.as_deref() {
      Some(pattern) if !pattern.is_empty() => match compile_full_match(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
          problems.push(format!("regex: {e}"));
          None
        },
      },
      _ => {
        problems.push("regex is required");
        None
      },
    };

    let action = config.action.as_deref().unwrap_or("replace");
    let target_label = config.target_label.as_deref().filter(|label| !label.is_empty());
    let replacement = config.replacement.as_deref();
    if action == "replace" {
      problems.check(target_label.is_some(), "target_label is required for replace");
      problems.check(replacement.is_some(), "replacement is required for replace");
    }

    let Some(regex) = regex else {
      return Err(problems.into_violation());
    };
    let action = match (action, target_label, replacement) {
      ("replace", Some(target_label), Some(replacement)) => RelabelAction::Replace {
        target_label: target_label.to_string(),
        replacement: CaptureTemplate::parse(replacement, regex.captures_len()),
      },
      ("drop-metric", ..) => RelabelAction::DropMetric,
      ("replace", ..) => return Err(problems.into_violation()),
      (unknown, ..) => {
        problems.push(format!(
          "unrecognized action '{unknown}', expected replace or drop-metric"
        ));
        // Only an unknown action on an otherwise well formed rule is a soft failure.
        if problems.len() > 1 {
          return Err(problems.into_violation());
        }
        let violation = problems.into_violation();
        log::warn!("relabel rule disabled: {violation}");
        return Ok(RelabelOutcome::Disabled(violation));
      },
    };

    problems
      .finish(Self {
        source_labels: config.source_labels.clone(),
        regex,
        action,
      })
      .map(RelabelOutcome::Active)
  }

  #[must_use]
  pub const fn action(&self) -> &RelabelAction {
    &self.action
  }

  // Join the source label values in order. `__name__` resolves to the metric name. Any missing
  // source label means the rule does not apply, so the regex is never evaluated.
  fn joined_source_values(&self, metric_name: &str, labels: &Labels) -> Option<String> {
    let values: Option<Vec<&str>> = self
      .source_labels
      .iter()
      .map(|label| {
        if label == METRIC_NAME_LABEL {
          Some(metric_name)
        } else {
          labels.get(label).map(String::as_str)
        }
      })
      .collect();

    values.map(|values| values.iter().join(SOURCE_LABEL_SEPARATOR))
  }

  // Returns the input untouched unless this is a replace rule that matches, in which case a copy
  // with the target label set is returned.
  #[must_use]
  pub fn apply<'a>(&self, metric_name: &str, labels: &'a Labels) -> Cow<'a, Labels> {
    let RelabelAction::Replace {
      target_label,
      replacement,
    } = &self.action
    else {
      return Cow::Borrowed(labels);
    };

    let Some(joined) = self.joined_source_values(metric_name, labels) else {
      return Cow::Borrowed(labels);
    };
    let Some(captures) = self.regex.captures(&joined) else {
      return Cow::Borrowed(labels);
    };

    let mut relabeled = labels.clone();
    relabeled.insert(target_label.clone(), replacement.render(&captures));
    Cow::Owned(relabeled)
  }

  #[must_use]
  pub fn should_drop(&self, metric_name: &str, labels: &Labels) -> bool {
    if self.action != RelabelAction::DropMetric {
      return false;
    }

    self
      .joined_source_values(metric_name, labels)
      .is_some_and(|joined| self.regex.is_match(&joined))
  }
}
