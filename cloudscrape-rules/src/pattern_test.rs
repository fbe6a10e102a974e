// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use super::*;
use assert_matches::assert_matches;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

#[test]
fn empty_pattern() {
  assert_matches!(PatternMatcher::new(""), Err(PatternError::Empty));
  assert_matches!(PatternMatcher::new("!"), Err(PatternError::Empty));
}

#[test]
fn invalid_regex() {
  assert_matches!(
    PatternMatcher::new("orders(.+"),
    Err(PatternError::InvalidRegex { pattern, .. }) if pattern == "orders(.+"
  );
  assert_matches!(
    PatternMatcher::new("!orders(.+"),
    Err(PatternError::InvalidRegex { pattern, .. }) if pattern == "orders(.+"
  );
}

#[test]
fn pattern_cannot_escape_anchors() {
  assert_matches!(
    PatternMatcher::new("a)|(b"),
    Err(PatternError::InvalidRegex { pattern, .. }) if pattern == "a)|(b"
  );
  assert_matches!(
    PatternMatcher::new("!x)(y"),
    Err(PatternError::InvalidRegex { .. })
  );
  assert_matches!(
    compile_full_match("x)(y"),
    Err(PatternError::InvalidRegex { .. })
  );
}

#[test]
fn full_match_only() {
  let matcher = PatternMatcher::new("orders-.+").unwrap();
  assert!(matcher.matches(Some("orders-prod")));
  assert!(!matcher.matches(Some("my-orders-prod")));
  assert!(!matcher.matches(Some("orders-")));
  assert!(!matcher.matches(None));

  // Alternation must not escape the anchors.
  let matcher = PatternMatcher::new("a|b").unwrap();
  assert!(matcher.matches(Some("a")));
  assert!(!matcher.matches(Some("ab")));
}

#[test]
fn negated() {
  let matcher = PatternMatcher::new("!orders-.+").unwrap();
  assert!(matcher.is_negated());
  assert_eq!("!orders-.+", matcher.pattern());
  assert!(!matcher.matches(Some("orders-prod")));
  assert!(matcher.matches(Some("users-prod")));
  assert!(!matcher.matches(None));
}

#[test]
fn absence_assertion() {
  let matcher = PatternMatcher::new(NOT_PRESENT).unwrap();
  assert!(matcher.is_absence_assertion());
  assert!(matcher.matches(None));
  assert!(!matcher.matches(Some("")));
  assert!(!matcher.matches(Some("anything")));
}

#[quickcheck]
fn negation_inverts_match(pattern: String, value: String) -> TestResult {
  let (Ok(matcher), Ok(negated)) = (
    PatternMatcher::new(&pattern),
    PatternMatcher::new(&format!("!{pattern}")),
  ) else {
    return TestResult::discard();
  };
  if matcher.is_absence_assertion() || matcher.is_negated() {
    return TestResult::discard();
  }

  TestResult::from_bool(matcher.matches(Some(&value)) != negated.matches(Some(&value)))
}
