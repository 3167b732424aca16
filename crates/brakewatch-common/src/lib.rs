//! Brakewatch-Common: shared error type and media path utilities.
//!
//! - **Error Handling**: [`Error`] and the [`Result`] alias used by every
//!   brakewatch component
//! - **Path Utilities**: [`paths::ExtensionMatcher`] for recognizing media files
//!   and helpers to list and rename them
//!
//! # Examples
//!
//! ```
//! use brakewatch_common::paths::ExtensionMatcher;
//! use std::path::Path;
//!
//! let matcher = ExtensionMatcher::new(["mkv", "avi"]);
//! assert!(matcher.matches("MKV"));
//! assert!(matcher.matches_path(Path::new("/watch/movie.avi")));
//! ```

pub mod error;
pub mod paths;

pub use error::{Error, Result};
