//! Transcoding of watched media files.
//!
//! A job runs the external transcoder against one source file, streams the
//! progress it prints, and moves the finished output into the output
//! directory:
//!
//! - [`progress`]: pulling a percentage out of a chunk of transcoder output
//! - [`JobRunner`]: spawning the transcoder and placing its output
//! - [`JobSupervisor`]: throttling progress onto the status hub and cleaning up

pub mod progress;

mod output;
mod runner;
mod supervisor;

pub use output::{move_output, Placement};
pub use progress::parse_progress;
pub use runner::{JobRunner, RunningJob, READ_CHUNK_SIZE};
pub use supervisor::{JobReport, JobSupervisor, StatusUpdate, Throttle, THROTTLE_WINDOW};
