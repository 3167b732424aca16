//! Path utilities for recognizing media files by extension.
//!
//! The watcher, the queue listing and the source browser all decide what counts
//! as a media file through one [`ExtensionMatcher`], built once at startup and
//! shared read-only afterwards.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Extensions recognized when the configuration does not name any.
pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &["m4v", "avi", "mpg", "mpeg", "mkv", "mov"];

/// Case-insensitive membership test against a sorted set of extensions.
///
/// The set is lowercased, sorted and deduplicated on construction so that
/// [`matches`](Self::matches) can binary search it.
///
/// # Examples
///
/// ```
/// use brakewatch_common::paths::ExtensionMatcher;
///
/// let matcher = ExtensionMatcher::new(["mov", "MKV", "avi"]);
/// assert!(matcher.matches("mkv"));
/// assert!(matcher.matches(".Mov"));
/// assert!(!matcher.matches("srt"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMatcher {
    extensions: Vec<String>,
}

impl ExtensionMatcher {
    /// Build a matcher from any list of extensions (with or without a leading dot).
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extensions: Vec<String> = extensions
            .into_iter()
            .map(|e| normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        extensions.sort();
        extensions.dedup();
        Self { extensions }
    }

    /// Check whether `ext` is one of the recognized extensions.
    pub fn matches(&self, ext: &str) -> bool {
        let ext = normalize(ext);
        self.extensions
            .binary_search_by(|candidate| candidate.as_str().cmp(ext.as_str()))
            .is_ok()
    }

    /// Check whether the path's extension is recognized.
    pub fn matches_path(&self, path: &Path) -> bool {
        media_extension(path).is_some_and(|ext| self.matches(&ext))
    }

    /// The sorted, lowercased extension set.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// True when no extension is recognized.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl Default for ExtensionMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MEDIA_EXTENSIONS)
    }
}

fn normalize(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

/// Lowercased extension of a path, without the dot.
///
/// # Examples
///
/// ```
/// use brakewatch_common::paths::media_extension;
/// use std::path::Path;
///
/// assert_eq!(media_extension(Path::new("/in/Movie.MKV")).as_deref(), Some("mkv"));
/// assert_eq!(media_extension(Path::new("README")), None);
/// ```
pub fn media_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// List the media files directly inside `dir`, sorted by path.
///
/// Unreadable entries are skipped. A missing directory yields an empty list.
pub fn find_files_by_extension(dir: &Path, matcher: &ExtensionMatcher) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| matcher.matches_path(path))
        .collect();
    files.sort();
    files
}

/// File name of `path` with its extension replaced by `extension`.
///
/// # Examples
///
/// ```
/// use brakewatch_common::paths::output_file_name;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(
///     output_file_name(Path::new("/watch/movie.mpeg"), "m4v"),
///     Some(PathBuf::from("movie.m4v"))
/// );
/// ```
pub fn output_file_name(path: &Path, extension: &str) -> Option<PathBuf> {
    let name = path.file_name()?;
    Some(Path::new(name).with_extension(extension.trim_start_matches('.')))
}
