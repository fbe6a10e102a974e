// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./validate_test.rs"]
mod validate_test;

use itertools::Itertools;
use std::fmt;

//
// Violation
//

/// Every problem found for a single configuration entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
  pub entity: String,
  pub problems: Vec<String>,
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.entity, self.problems.iter().join("; "))
  }
}

//
// ValidationError
//

/// Structural errors across the whole document. A configuration that produces this error never
/// becomes active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
  pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "invalid configuration ({} violation(s)): {}",
      self.violations.len(),
      self.violations.iter().join(" | ")
    )
  }
}

impl std::error::Error for ValidationError {}

//
// Problems
//

// Accumulates the problems of one entity so they can be reported together.
pub(crate) struct Problems {
  entity: String,
  problems: Vec<String>,
}

impl Problems {
  pub fn new(entity: impl Into<String>) -> Self {
    Self {
      entity: entity.into(),
      problems: Vec::new(),
    }
  }

  pub fn push(&mut self, problem: impl Into<String>) {
    self.problems.push(problem.into());
  }

  pub fn check(&mut self, ok: bool, problem: &str) {
    if !ok {
      self.push(problem);
    }
  }

  // Intervals and periods must be positive multiples of 60 seconds.
  pub fn check_seconds(&mut self, field: &str, value: Option<i64>) {
    if let Some(value) = value
      && !is_valid_seconds(value)
    {
      self.push(format!(
        "{field} must be a positive multiple of 60 seconds, got {value}"
      ));
    }
  }

  pub fn len(&self) -> usize {
    self.problems.len()
  }

  pub fn finish<T>(self, value: T) -> Result<T, Violation> {
    if self.problems.is_empty() {
      Ok(value)
    } else {
      Err(self.into_violation())
    }
  }

  pub fn into_violation(self) -> Violation {
    Violation {
      entity: self.entity,
      problems: self.problems,
    }
  }
}

#[must_use]
pub const fn is_valid_seconds(value: i64) -> bool {
  value > 0 && value % 60 == 0
}

//
// ViolationCollector
//

// Gathers violations across entities while keeping every successfully compiled entity.
#[derive(Default)]
pub(crate) struct ViolationCollector {
  violations: Vec<Violation>,
}

impl ViolationCollector {
  pub fn collect<T>(&mut self, result: Result<T, Violation>) -> Option<T> {
    match result {
      Ok(value) => Some(value),
      Err(violation) => {
        self.violations.push(violation);
        None
      },
    }
  }

  pub fn finish<T>(self, value: T) -> Result<T, ValidationError> {
    if self.violations.is_empty() {
      Ok(value)
    } else {
      Err(ValidationError {
        violations: self.violations,
      })
    }
  }
}
