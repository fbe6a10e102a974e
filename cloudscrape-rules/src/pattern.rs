// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./pattern_test.rs"]
mod pattern_test;

use regex::Regex;
use thiserror::Error;

/// Pattern literal that asserts a value is absent rather than matching it.
pub const NOT_PRESENT: &str = "NOT_PRESENT";

#[derive(Debug, Error)]
pub enum PatternError {
  #[error("pattern must not be empty")]
  Empty,
  #[error("invalid regex '{pattern}': {source}")]
  InvalidRegex {
    pattern: String,
    #[source]
    source: Box<regex::Error>,
  },
}

// Compile a regex that must match the entire input, not a substring of it. The pattern has to be
// valid on its own so it cannot close the anchoring group.
pub fn compile_full_match(pattern: &str) -> Result<Regex, PatternError> {
  let invalid = |e| PatternError::InvalidRegex {
    pattern: pattern.to_string(),
    source: Box::new(e),
  };
  Regex::new(pattern).map_err(invalid)?;
  Regex::new(&format!("^(?:{pattern})$")).map_err(invalid)
}

//
// MatchMode
//

#[derive(Debug)]
enum MatchMode {
  Match(Regex),
  Negate(Regex),
  AssertAbsent,
}

//
// PatternMatcher
//

/// A single compiled pattern. `NOT_PRESENT` asserts that a value is absent, a leading `!` negates
/// the remainder of the pattern, and anything else must match the whole value.
#[derive(Debug)]
pub struct PatternMatcher {
  pattern: String,
  mode: MatchMode,
}

impl PatternMatcher {
  pub fn new(pattern: &str) -> Result<Self, PatternError> {
    if pattern.is_empty() {
      return Err(PatternError::Empty);
    }

    let mode = if pattern == NOT_PRESENT {
      MatchMode::AssertAbsent
    } else if let Some(negated) = pattern.strip_prefix('!') {
      if negated.is_empty() {
        return Err(PatternError::Empty);
      }
      MatchMode::Negate(compile_full_match(negated)?)
    } else {
      MatchMode::Match(compile_full_match(pattern)?)
    };

    Ok(Self {
      pattern: pattern.to_string(),
      mode,
    })
  }

  #[must_use]
  pub fn matches(&self, value: Option<&str>) -> bool {
    match (&self.mode, value) {
      (MatchMode::AssertAbsent, value) => value.is_none(),
      (_, None) => false,
      (MatchMode::Negate(regex), Some(value)) => !regex.is_match(value),
      (MatchMode::Match(regex), Some(value)) => regex.is_match(value),
    }
  }

  #[must_use]
  pub fn pattern(&self) -> &str {
    &self.pattern
  }

  #[must_use]
  pub const fn is_absence_assertion(&self) -> bool {
    matches!(self.mode, MatchMode::AssertAbsent)
  }

  #[must_use]
  pub const fn is_negated(&self) -> bool {
    matches!(self.mode, MatchMode::Negate(_))
  }
}
