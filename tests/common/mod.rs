//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which lays out watch, output and source directories
//! under a temp dir, spawns a [`StatusHub`] and builds the [`AppContext`]. The
//! [`with_server`](TestHarness::with_server) constructor starts Axum on a random
//! port for WebSocket testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use brakewatch::config::Config;
use brakewatch::conversion::{JobRunner, JobSupervisor};
use brakewatch::hub::{HubHandle, StatusHub};
use brakewatch::server::{create_router, AppContext};
use tempfile::TempDir;

pub struct TestHarness {
    pub ctx: AppContext,
    pub hub: HubHandle,
    pub root: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(|_, _| {})
    }

    /// Create a harness, letting the caller adjust the config after the
    /// directories have been filled in. The closure also gets the root dir.
    pub fn with_config(adjust: impl FnOnce(&mut Config, &Path)) -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();

        for dir in ["watch", "output", "source", "static", "work", "bin"] {
            std::fs::create_dir(root.path().join(dir)).expect("failed to create dir");
        }
        config.watch.input_dir = root.path().join("watch");
        config.watch.output_dir = root.path().join("output");
        config.watch.source_dir = root.path().join("source");
        config.server.static_dir = root.path().join("static");
        config.transcoder.temp_dir = Some(root.path().join("work"));
        adjust(&mut config, root.path());

        let hub = StatusHub::spawn();
        let ctx = AppContext::new(hub.clone(), config);
        Self { ctx, hub, root }
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    pub fn watch_dir(&self) -> &Path {
        &self.ctx.config.watch.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.ctx.config.watch.output_dir
    }

    pub fn source_dir(&self) -> &Path {
        &self.ctx.config.watch.source_dir
    }

    pub fn router(&self) -> axum::Router {
        create_router(self.ctx.clone(), Some(self.config().server.static_dir.clone()))
    }

    pub fn supervisor(&self) -> JobSupervisor {
        let config = self.config();
        let runner = JobRunner::new(&config.transcoder, &config.watch.output_dir);
        JobSupervisor::new(runner, self.hub.clone(), config.watch.delete_on_completion)
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let app = harness.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Write `contents` to `relative` under the root and return the path.
    pub fn write_file(&self, relative: impl AsRef<Path>, contents: &[u8]) -> PathBuf {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        std::fs::write(&path, contents).expect("failed to write file");
        path
    }
}

/// Poll the hub until it reports `expected` connections.
pub async fn wait_for_subscribers(hub: &HubHandle, expected: usize) {
    for _ in 0..200 {
        if hub.connection_count().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("hub never reached {expected} subscribers");
}

/// Poll until `path` exists.
pub async fn wait_for_file(path: &Path, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    path.exists()
}

/// Transcoder stand-in that prints three progress lines with pauses between
/// them, then copies its input to its output.
///
/// Progress arrives at roughly 0 s, 1 s and 2.5 s.
#[cfg(unix)]
pub const PROGRESS_SCRIPT: &str = r#"#!/bin/sh
# -i <input> --preset=<preset> -o <output>
printf '  12.34 %%\n'
sleep 1
printf '  55.10 %%\n'
sleep 1.5
printf '  99.99 %%\n'
cp "$2" "$5"
"#;

/// Transcoder stand-in that reports some progress and then fails.
#[cfg(unix)]
pub const FAILING_SCRIPT: &str = r#"#!/bin/sh
printf '  3.50 %%\n'
exit 3
"#;

/// Transcoder stand-in that finishes immediately.
#[cfg(unix)]
pub const QUICK_SCRIPT: &str = r#"#!/bin/sh
printf '  100.00 %%\n'
cp "$2" "$5"
"#;

/// Transcoder stand-in that records its pid next to itself and never finishes.
#[cfg(unix)]
pub const HANGING_SCRIPT: &str = r#"#!/bin/sh
echo $$ > "$(dirname "$0")/transcoder.pid"
exec sleep 60
"#;

/// Install an executable script under `dir` and return its path.
#[cfg(unix)]
pub fn install_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, body).expect("failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod script");
    path
}

/// Harness whose transcoder is a script with the given body.
#[cfg(unix)]
pub fn harness_with_script(body: &str) -> TestHarness {
    TestHarness::with_config(|config, root| {
        let script = install_script(&root.join("bin"), "fake-transcoder", body);
        config.transcoder.program = script.to_string_lossy().to_string();
    })
}
