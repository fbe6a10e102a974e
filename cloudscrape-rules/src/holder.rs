// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./holder_test.rs"]
mod holder_test;

use crate::config::{ConfigError, ScrapeConfigOverrides, load_from_str};
use crate::file_watcher::DynamicFileWatcher;
use crate::rules::ScrapeRules;
use bd_server_stats::stats::Scope;
use bd_shutdown::ComponentShutdown;
use bd_time::TimeDurationExt;
use log::{info, warn};
use parking_lot::RwLock;
use prometheus::IntCounter;
use std::sync::Arc;
use time::ext::NumericalDuration;
use tokio::task::JoinHandle;

//
// ConfigStats
//

struct ConfigStats {
  updated: IntCounter,
  failed_update: IntCounter,
  poll_fail: IntCounter,
}

impl ConfigStats {
  fn new(scope: &Scope) -> Self {
    let scope = scope.scope("config");
    Self {
      updated: scope.counter("updated"),
      failed_update: scope.counter("failed_update"),
      poll_fail: scope.counter("poll_fail"),
    }
  }
}

//
// ConfigHolder
//

/// Holds the active compiled configuration. Readers take a snapshot and keep using it for as long
/// as they like, a new configuration is only ever installed whole.
pub struct ConfigHolder {
  current: RwLock<Arc<ScrapeRules>>,
  overrides: ScrapeConfigOverrides,
  stats: ConfigStats,
}

impl ConfigHolder {
  #[must_use]
  pub fn new(initial: ScrapeRules, overrides: ScrapeConfigOverrides, scope: &Scope) -> Self {
    Self {
      current: RwLock::new(Arc::new(initial)),
      overrides,
      stats: ConfigStats::new(scope),
    }
  }

  #[must_use]
  pub fn snapshot(&self) -> Arc<ScrapeRules> {
    self.current.read().clone()
  }

  pub fn replace(&self, rules: ScrapeRules) {
    *self.current.write() = Arc::new(rules);
    self.stats.updated.inc();
  }

  // Compile the new document off to the side. The active configuration is only swapped when the
  // whole document is valid.
  pub fn update_from_str(&self, yaml: &str) -> Result<(), ConfigError> {
    match load_from_str(yaml, &self.overrides) {
      Ok(rules) => {
        self.replace(rules);
        info!("scrape configuration updated");
        Ok(())
      },
      Err(e) => {
        warn!("rejected scrape configuration update, keeping previous: {e}");
        self.stats.failed_update.inc();
        Err(e)
      },
    }
  }

  pub fn update_from_bytes(&self, bytes: &[u8]) -> Result<(), ConfigError> {
    match std::str::from_utf8(bytes) {
      Ok(yaml) => self.update_from_str(yaml),
      Err(e) => {
        self.stats.failed_update.inc();
        Err(e.into())
      },
    }
  }

  // Reload on every file change until shutdown. Failed reloads are logged and counted, the
  // previous configuration keeps serving.
  pub fn spawn_reload(
    self: Arc<Self>,
    watcher: DynamicFileWatcher,
    shutdown: ComponentShutdown,
  ) -> JoinHandle<()> {
    tokio::spawn(async move {
      self.reload_loop(watcher, shutdown).await;
    })
  }

  async fn reload_loop(&self, mut watcher: DynamicFileWatcher, mut shutdown: ComponentShutdown) {
    let shutdown = shutdown.cancelled();
    tokio::pin!(shutdown);

    loop {
      let file = tokio::select! {
        () = &mut shutdown => break,
        file = watcher.wait_until_modified() => file,
      };

      let file = match file {
        Ok(file) => file,
        Err(e) => {
          self.stats.poll_fail.inc();
          warn!("failed to poll config watcher: {e}");
          1.seconds().sleep().await;
          continue;
        },
      };

      info!("config change detected, reloading");
      // Failures are already logged and counted.
      let _ = self.update_from_bytes(&file);
    }

    info!("config reload stopped");
  }
}
