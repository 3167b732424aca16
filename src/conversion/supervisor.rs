//! Driving one job from start to cleanup and publishing its progress.

use std::path::{Path, PathBuf};
use std::time::Duration;

use brakewatch_common::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::output::Placement;
use super::runner::{JobRunner, RunningJob};
use crate::hub::HubHandle;

/// Minimum interval between two published updates of the same job.
pub const THROTTLE_WINDOW: Duration = Duration::from_secs(2);

/// Wire payload sent to subscribers: `{"Name": "...", "Progress": 12.34}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusUpdate {
    pub name: String,
    pub progress: f64,
}

impl StatusUpdate {
    pub fn new(name: impl Into<String>, progress: f64) -> Self {
        Self {
            name: name.into(),
            progress: progress.clamp(0.0, 100.0),
        }
    }
}

/// Rate limiter letting the first value through and then at most one value
/// per window.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether a value arriving at `now` may be emitted. Records the emission
    /// when it may.
    pub fn ready(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

/// Aborts the job task, and with it the transcoder, if `handle` is dropped
/// before the job ends.
struct AbortOnDrop(JoinHandle<Result<Placement>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// What happened to one file.
#[derive(Debug)]
pub struct JobReport {
    pub file: PathBuf,
    pub updates_published: usize,
    pub result: Result<Placement>,
    pub source_deleted: bool,
}

/// Runs one file at a time through a [`JobRunner`] and reports progress to the
/// hub.
///
/// `handle` processes a single file and returns; callers are responsible for
/// never running two jobs at once.
#[derive(Debug, Clone)]
pub struct JobSupervisor {
    runner: JobRunner,
    hub: HubHandle,
    delete_on_completion: bool,
}

impl JobSupervisor {
    pub fn new(runner: JobRunner, hub: HubHandle, delete_on_completion: bool) -> Self {
        Self {
            runner,
            hub,
            delete_on_completion,
        }
    }

    pub async fn handle(&self, file: &Path) -> JobReport {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.display().to_string());

        tracing::info!(file = %file.display(), "Processing {}", name);

        let RunningJob {
            mut progress,
            outcome,
        } = self.runner.start(file);
        let mut outcome = AbortOnDrop(outcome);

        let mut throttle = Throttle::new(THROTTLE_WINDOW);
        let mut updates_published = 0;

        while let Some(value) = progress.recv().await {
            tracing::trace!(file = %name, progress = value, "Transcoder progress");
            if !throttle.ready(Instant::now()) {
                continue;
            }

            match serde_json::to_string(&StatusUpdate::new(&name, value)) {
                Ok(json) => {
                    self.hub.publish(json);
                    updates_published += 1;
                }
                Err(e) => tracing::warn!(error = %e, "Failed to serialize status update"),
            }
        }

        // No retries: a failed job is logged and the queue moves on.
        let result = match (&mut outcome.0).await {
            Ok(result) => result,
            Err(e) => Err(Error::internal(format!("job task failed: {e}"))),
        };
        match &result {
            Ok(Placement::Stranded { temp, reason }) => tracing::error!(
                file = %file.display(),
                temp = %temp.display(),
                error = %reason,
                "Transcode finished but output could not be moved"
            ),
            Ok(placement) => tracing::info!(
                file = %file.display(),
                output = %placement.path().display(),
                "Transcode finished"
            ),
            Err(e) => tracing::error!(file = %file.display(), error = %e, "Job failed"),
        }

        tracing::info!("Finished {}", file.display());

        let source_deleted = self.delete_on_completion && delete_source(file).await;

        JobReport {
            file: file.to_path_buf(),
            updates_published,
            result,
            source_deleted,
        }
    }
}

async fn delete_source(file: &Path) -> bool {
    match tokio::fs::remove_file(file).await {
        Ok(()) => {
            tracing::debug!(file = %file.display(), "Deleted source");
            true
        }
        Err(e) => {
            tracing::warn!(file = %file.display(), error = %e, "Failed to delete source");
            false
        }
    }
}
