// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./env_test.rs"]
mod env_test;

// Interpret a boolean-like flag. Only y/yes/true (case-insensitive) are truthy.
#[must_use]
pub fn is_truthy(value: &str) -> bool {
  matches!(
    value.trim().to_ascii_lowercase().as_str(),
    "y" | "yes" | "true"
  )
}

// Split a comma-separated list, trimming entries and skipping blanks.
#[must_use]
pub fn split_list(value: &str) -> Vec<String> {
  value
    .split(',')
    .map(str::trim)
    .filter(|entry| !entry.is_empty())
    .map(ToString::to_string)
    .collect()
}

// Read an environment variable, treating an unset or non-unicode value as absent.
#[must_use]
pub fn var(name: &str) -> Option<String> {
  let value = std::env::var(name).ok();
  if let Some(value) = &value {
    log::debug!("environment override {name}={value}");
  }
  value
}
