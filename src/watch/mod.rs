//! Discovery of new media files in the watch directory.
//!
//! Files already present at startup and files created or moved in afterwards
//! end up on the same queue. A single consumer hands them to the [`JobSupervisor`] one at a
//! time, so at most one transcode runs at once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use brakewatch_common::paths::{find_files_by_extension, ExtensionMatcher};
use brakewatch_common::{Error, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::conversion::JobSupervisor;

/// Watches one directory and feeds its media files to a [`JobSupervisor`].
pub struct FileWatcher {
    dir: PathBuf,
    matcher: Arc<ExtensionMatcher>,
    supervisor: JobSupervisor,
    watcher: Option<RecommendedWatcher>,
}

impl FileWatcher {
    pub fn new(dir: impl Into<PathBuf>, matcher: Arc<ExtensionMatcher>, supervisor: JobSupervisor) -> Self {
        Self {
            dir: dir.into(),
            matcher,
            supervisor,
            watcher: None,
        }
    }

    /// Start watching and queue the files already in the directory.
    ///
    /// The directory watch is set up before the scan so that nothing created in
    /// between is missed. Failing to create or register the watch is returned as
    /// [`Error::Watch`]. The returned task processes the queue until the watcher
    /// is stopped.
    pub fn start(&mut self) -> Result<JoinHandle<()>> {
        let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();

        let matcher = self.matcher.clone();
        let event_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for path in created_media_files(&event, &matcher) {
                        tracing::debug!(file = %path.display(), "File arrived");
                        let _ = event_tx.send(path);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Watch error"),
            },
            Config::default(),
        )
        .map_err(|e| Error::watch(format!("failed to create watcher: {e}")))?;

        watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(|e| Error::watch(format!("failed to watch {}: {e}", self.dir.display())))?;
        tracing::info!("Watching directory: {}", self.dir.display());

        self.watcher = Some(watcher);

        let existing = queue_existing(&self.dir, &self.matcher, &tx);
        if existing > 0 {
            tracing::info!("Queued {} existing file(s) from {}", existing, self.dir.display());
        }
        drop(tx);

        Ok(spawn_consumer(self.supervisor.clone(), rx))
    }

    /// Stop watching. The consumer finishes the current job and whatever is
    /// still queued, then exits.
    pub fn stop(&mut self) {
        self.watcher = None;
        tracing::info!("File watcher stopped");
    }
}

/// Media files that arrived in the directory: created there, or moved in.
///
/// A rename reported with both ends only counts its destination.
pub fn created_media_files(event: &Event, matcher: &ExtensionMatcher) -> Vec<PathBuf> {
    let arrived: &[PathBuf] = match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => &event.paths,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.last() {
            Some(to) => std::slice::from_ref(to),
            None => &[],
        },
        _ => &[],
    };
    arrived
        .iter()
        .filter(|path| matcher.matches_path(path))
        .cloned()
        .collect()
}

/// Send every media file currently in `dir` to `tx`. Returns how many were
/// queued.
pub fn queue_existing(dir: &Path, matcher: &ExtensionMatcher, tx: &mpsc::UnboundedSender<PathBuf>) -> usize {
    let mut queued = 0;
    for path in find_files_by_extension(dir, matcher) {
        if tx.send(path).is_err() {
            break;
        }
        queued += 1;
    }
    queued
}

/// Run queued files through `supervisor` strictly one after another.
///
/// A file that no longer exists when its turn comes (already handled via
/// another event, or removed) is skipped.
pub fn spawn_consumer(supervisor: JobSupervisor, mut rx: mpsc::UnboundedReceiver<PathBuf>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(path) = rx.recv().await {
            if !path.exists() {
                tracing::debug!(file = %path.display(), "Skipping vanished file");
                continue;
            }
            supervisor.handle(&path).await;
        }
        tracing::debug!("Job queue closed");
    })
}
