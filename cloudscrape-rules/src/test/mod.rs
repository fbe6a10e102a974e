// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use crate::config::{ScrapeConfigOverrides, load_from_str};
use crate::labels::Labels;
use crate::pipeline::RawMetric;
use crate::rules::ScrapeRules;
use std::fs;
use std::io::Write;
use std::os::unix::fs as os_fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

#[must_use]
pub fn make_labels(pairs: &[(&str, &str)]) -> Labels {
  pairs
    .iter()
    .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
    .collect()
}

#[must_use]
pub fn make_raw_metric(namespace: &str, metric_name: &str, dimensions: &[(&str, &str)]) -> RawMetric {
  RawMetric {
    namespace: namespace.to_string(),
    metric_name: metric_name.to_string(),
    dimensions: make_labels(dimensions),
    tags: Labels::new(),
  }
}

// Compiles a document without any environment overrides, panicking on any error.
#[must_use]
pub fn make_rules(yaml: &str) -> Arc<ScrapeRules> {
  Arc::new(load_from_str(yaml, &ScrapeConfigOverrides::default()).unwrap())
}

//
// FsConfigSwapHelper
//

/// Lays out a config file the way a mounted config map does, `config.yaml` pointing through a
/// `..data` symlink that is atomically swapped on update.
pub struct FsConfigSwapHelper {
  temp_dir: TempDir,
  index: u64,
}

impl FsConfigSwapHelper {
  fn create_dir_and_file(&self, file_contents: &str) {
    let data_dir_path = self.temp_dir.path().join(format!("data_dir{}", self.index));
    fs::create_dir(&data_dir_path).unwrap();

    let data_file_path = data_dir_path.join("config.yaml");
    log::trace!("writing new config to: {}", data_file_path.display());
    let mut data_file = fs::File::create(data_file_path).unwrap();
    data_file.write_all(file_contents.as_bytes()).unwrap();
  }

  #[must_use]
  pub fn new(initial_contents: &str) -> Self {
    let mut helper = Self {
      temp_dir: TempDir::new().unwrap(),
      index: 0,
    };
    helper.create_dir_and_file(initial_contents);

    os_fs::symlink(
      helper.temp_dir.path().join("data_dir0"),
      helper.temp_dir.path().join("..data"),
    )
    .unwrap();
    os_fs::symlink(
      helper.temp_dir.path().join("..data").join("config.yaml"),
      helper.config_path(),
    )
    .unwrap();

    helper.index += 1;
    helper
  }

  #[must_use]
  pub fn path(&self) -> &Path {
    self.temp_dir.path()
  }

  #[must_use]
  pub fn config_path(&self) -> PathBuf {
    self.temp_dir.path().join("config.yaml")
  }

  pub fn update_config(&mut self, new_contents: &str) {
    self.create_dir_and_file(new_contents);
    os_fs::symlink(
      self.temp_dir.path().join(format!("data_dir{}", self.index)),
      self.temp_dir.path().join("..data.new"),
    )
    .unwrap();
    fs::rename(
      self.temp_dir.path().join("..data.new"),
      self.temp_dir.path().join("..data"),
    )
    .unwrap();
    self.index += 1;
  }
}
