// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

pub mod config;
pub mod file_watcher;
pub mod holder;
pub mod labels;
pub mod pattern;
pub mod pipeline;
pub mod rules;
pub mod template;
pub mod test;
pub mod validate;

#[cfg(test)]
#[ctor::ctor]
fn test_global_init() {
  use cloudscrape_common::global_initialize;

  global_initialize();
}
