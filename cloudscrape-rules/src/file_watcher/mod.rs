// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::watch;

pub mod local;

#[derive(Debug, Error)]
pub enum WatchError {
  #[error("failed to set up file watcher: {0}")]
  FileWatch(#[from] notify::Error),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("recv error: {0}")]
  Recv(#[from] watch::error::RecvError),
}

/// Tracks modifications of a configuration file.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileWatcher: Send + Sync {
  /// Blocks until the file has been modified. This should track all modifications that occur during
  /// the file watcher's lifetime, not just when this function is executing. Returns the new file
  /// bytes.
  async fn wait_until_modified(&mut self) -> Result<Bytes, WatchError>;
}

pub type DynamicFileWatcher = Box<dyn FileWatcher + Send + Sync + 'static>;
