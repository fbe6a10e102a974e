// cloudscrape - cloud metrics exporter rule engine
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./local_test.rs"]
mod local_test;

use super::{FileWatcher, WatchError};
use async_trait::async_trait;
use bytes::Bytes;
use log::warn;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, Watcher};
use std::path::PathBuf;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;

//
// LocalFileSource
//

/// A configuration file and the directory watched for it. Configuration mounted from a config map
/// is swapped through a `..data` symlink rename in `dir`, so the directory is what gets watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileSource {
  pub dir: PathBuf,
  pub file: PathBuf,
}

impl LocalFileSource {
  // Watch the directory containing the file.
  #[must_use]
  pub fn for_file(file: impl Into<PathBuf>) -> Self {
    let file = file.into();
    let dir = file
      .parent()
      .filter(|parent| !parent.as_os_str().is_empty())
      .map_or_else(|| PathBuf::from("."), PathBuf::from);
    Self { dir, file }
  }
}

//
// LocalFileWatcher
//

pub struct LocalFileWatcher {
  source: LocalFileSource,
  reload_rx: watch::Receiver<Instant>,
  _watcher: RecommendedWatcher,
}

impl LocalFileWatcher {
  // fsevents only reports "any" for renames, inotify merges both sides of the rename.
  #[cfg(target_os = "macos")]
  const fn rename_mode() -> RenameMode {
    RenameMode::Any
  }

  #[cfg(not(target_os = "macos"))]
  const fn rename_mode() -> RenameMode {
    RenameMode::Both
  }

  pub async fn new(source: LocalFileSource) -> Result<(Self, Bytes), WatchError> {
    let (reload_tx, reload_rx) = watch::channel(Instant::now());
    let mut watcher =
      notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| match res {
        Ok(event) => match event.kind {
          EventKind::Modify(ModifyKind::Name(mode)) if mode == Self::rename_mode() => {
            let _ = reload_tx.send(Instant::now());
          },
          _ => (),
        },
        Err(e) => {
          warn!("failed to watch local file for changes: {e}");
        },
      })?;

    watcher.watch(&source.dir, notify::RecursiveMode::NonRecursive)?;
    log::info!(
      "watching {} for changes to {}",
      source.dir.display(),
      source.file.display()
    );
    let watcher = Self {
      source,
      reload_rx,
      _watcher: watcher,
    };
    let file = watcher.load_file().await?;

    Ok((watcher, file))
  }

  async fn load_file(&self) -> Result<Bytes, WatchError> {
    let mut bytes = Vec::new();
    File::open(&self.source.file)
      .await?
      .read_to_end(&mut bytes)
      .await?;
    Ok(bytes.into())
  }
}

#[async_trait]
impl FileWatcher for LocalFileWatcher {
  async fn wait_until_modified(&mut self) -> Result<Bytes, WatchError> {
    self.reload_rx.changed().await?;
    self.load_file().await
  }
}
