//! Running the external transcoder for a single file.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use brakewatch_common::paths::output_file_name;
use brakewatch_common::{Error, Result};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::output::{move_output, Placement};
use super::progress::parse_progress;
use crate::config::TranscoderConfig;

/// Size of each read from the transcoder's stdout.
pub const READ_CHUNK_SIZE: usize = 1024;

/// A transcode in flight.
///
/// `progress` yields parsed percentages until the transcoder's stdout closes.
/// `outcome` resolves once the process has exited and its output has been
/// moved into place.
pub struct RunningJob {
    pub progress: mpsc::UnboundedReceiver<f64>,
    pub outcome: JoinHandle<Result<Placement>>,
}

/// Spawns the transcoder with a fixed argument shape:
/// `<program> -i <input> --preset=<preset> -o <temp output>`.
#[derive(Debug, Clone)]
pub struct JobRunner {
    program: String,
    preset: String,
    output_extension: String,
    temp_dir: PathBuf,
    output_dir: PathBuf,
}

impl JobRunner {
    pub fn new(config: &TranscoderConfig, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: config.program.clone(),
            preset: config.preset.clone(),
            output_extension: config.output_extension.clone(),
            temp_dir: config.resolved_temp_dir(),
            output_dir: output_dir.into(),
        }
    }

    /// Where the transcoder writes `input`'s output.
    pub fn temp_output_path(&self, input: &Path) -> Result<PathBuf> {
        Ok(self.temp_dir.join(self.output_name(input)?))
    }

    /// Final destination of `input`'s output.
    pub fn final_output_path(&self, input: &Path) -> Result<PathBuf> {
        Ok(self.output_dir.join(self.output_name(input)?))
    }

    fn output_name(&self, input: &Path) -> Result<PathBuf> {
        output_file_name(input, &self.output_extension)
            .ok_or_else(|| Error::invalid_input(format!("not a file path: {}", input.display())))
    }

    fn tool_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.clone())
    }

    /// Spawn [`run`](Self::run) on its own task. Aborting `outcome` kills the
    /// transcoder.
    pub fn start(&self, input: &Path) -> RunningJob {
        let (tx, progress) = mpsc::unbounded_channel();
        let runner = self.clone();
        let input = input.to_path_buf();
        let outcome = tokio::spawn(async move { runner.run(&input, tx).await });
        RunningJob { progress, outcome }
    }

    /// Transcode `input`, sending every parsed progress value on `progress`.
    ///
    /// The sender is dropped when stdout closes, which ends the progress
    /// sequence. A failure to spawn, to read stdout, or to wait for the process,
    /// and a non-zero exit status, abandon the job with [`Error::Tool`]. A failed
    /// move of the finished file is reported through [`Placement`] instead.
    pub async fn run(&self, input: &Path, progress: mpsc::UnboundedSender<f64>) -> Result<Placement> {
        let tool = self.tool_name();
        let temp = self.temp_output_path(input)?;
        let dest = self.final_output_path(input)?;

        tracing::info!(
            "Transcoding {} -> {} (preset={})",
            input.display(),
            temp.display(),
            self.preset
        );

        let mut child = Command::new(&self.program)
            .arg("-i")
            .arg(input)
            .arg(format!("--preset={}", self.preset))
            .arg("-o")
            .arg(&temp)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool(&tool, format!("failed to start: {e}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::tool(&tool, "stdout not available"))?;

        let reader = tokio::spawn(async move {
            let mut buf = [0u8; READ_CHUNK_SIZE];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Some(value) = parse_progress(&buf[..n]) {
                            // A dropped receiver must not stop the drain.
                            let _ = progress.send(value);
                        }
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Transcoder stdout read failed");
                        break;
                    }
                }
            }
        });

        let status = child
            .wait()
            .await
            .map_err(|e| Error::tool(&tool, format!("failed waiting for exit: {e}")))?;
        let _ = reader.await;

        if !status.success() {
            return Err(Error::tool(&tool, format!("exited with {status}")));
        }

        Ok(move_output(&temp, &dest).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(temp: &Path, out: &Path) -> JobRunner {
        let config = TranscoderConfig {
            temp_dir: Some(temp.to_path_buf()),
            ..TranscoderConfig::default()
        };
        JobRunner::new(&config, out)
    }

    #[test]
    fn output_paths_swap_extension() {
        let runner = runner(Path::new("/tmp/work"), Path::new("/srv/out"));
        let input = Path::new("/srv/in/Some Movie.mpeg");
        assert_eq!(
            runner.temp_output_path(input).unwrap(),
            Path::new("/tmp/work/Some Movie.m4v")
        );
        assert_eq!(
            runner.final_output_path(input).unwrap(),
            Path::new("/srv/out/Some Movie.m4v")
        );
    }

    #[test]
    fn output_path_needs_file_name() {
        let runner = runner(Path::new("/tmp"), Path::new("/out"));
        assert!(runner.final_output_path(Path::new("/")).is_err());
    }

    #[tokio::test]
    async fn missing_program_is_job_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = TranscoderConfig {
            program: "brakewatch-no-such-transcoder".to_string(),
            temp_dir: Some(dir.path().to_path_buf()),
            ..TranscoderConfig::default()
        };
        let runner = JobRunner::new(&config, dir.path());

        let mut job = runner.start(&dir.path().join("movie.mkv"));
        assert!(job.progress.recv().await.is_none());
        let err = job.outcome.await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Tool { .. }), "unexpected error: {err}");
        assert!(err.to_string().contains("failed to start"));
    }
}
