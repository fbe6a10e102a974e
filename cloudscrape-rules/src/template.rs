// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./template_test.rs"]
mod template_test;

use regex::Captures;

//
// Segment
//

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
  Literal(String),
  Group(usize),
}

//
// CaptureTemplate
//

/// A value template referencing numbered capture groups as `$0`..`$N`. Templates are parsed once
/// against the number of groups the regex exposes, so rendering never re-scans the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureTemplate {
  segments: Vec<Segment>,
}

impl CaptureTemplate {
  // `group_count` includes group 0. A `$` binds the longest digit run that names an existing group,
  // anything else is kept literally.
  #[must_use]
  pub fn parse(template: &str, group_count: usize) -> Self {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(dollar) = rest.find('$') {
      literal.push_str(&rest[.. dollar]);
      let after = &rest[dollar + 1 ..];
      let digits = after.bytes().take_while(u8::is_ascii_digit).count();

      let group = (1 ..= digits).rev().find_map(|len| {
        after[.. len]
          .parse::<usize>()
          .ok()
          .filter(|group| *group < group_count)
          .map(|group| (group, len))
      });

      match group {
        Some((group, len)) => {
          if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
          }
          segments.push(Segment::Group(group));
          rest = &after[len ..];
        },
        None => {
          literal.push('$');
          rest = after;
        },
      }
    }
    literal.push_str(rest);
    if !literal.is_empty() {
      segments.push(Segment::Literal(literal));
    }

    Self { segments }
  }

  #[must_use]
  pub fn render(&self, captures: &Captures<'_>) -> String {
    self
      .segments
      .iter()
      .fold(String::new(), |mut output, segment| {
        match segment {
          Segment::Literal(literal) => output.push_str(literal),
          Segment::Group(group) => {
            output.push_str(captures.get(*group).map_or("", |m| m.as_str()));
          },
        }
        output
      })
  }

  #[must_use]
  pub fn references_groups(&self) -> bool {
    self
      .segments
      .iter()
      .any(|segment| matches!(segment, Segment::Group(_)))
  }
}
