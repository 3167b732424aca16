//! Moving a finished transcode from its temp location to the output directory.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

/// Where a finished transcode ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Renamed into place.
    Renamed(PathBuf),
    /// Rename failed; copied into place and the temp file removed.
    Copied(PathBuf),
    /// Neither rename nor copy worked; the output is still at `temp`.
    Stranded { temp: PathBuf, reason: String },
}

impl Placement {
    /// Path of the transcoded file.
    pub fn path(&self) -> &Path {
        match self {
            Placement::Renamed(path) | Placement::Copied(path) => path,
            Placement::Stranded { temp, .. } => temp,
        }
    }

    /// True when the output reached its destination.
    pub fn is_delivered(&self) -> bool {
        !matches!(self, Placement::Stranded { .. })
    }
}

/// Move `temp` to `dest`, falling back to copy-then-delete when the rename
/// fails (for example across filesystems).
pub async fn move_output(temp: &Path, dest: &Path) -> Placement {
    move_output_with(temp, dest, |from, to| async move {
        tokio::fs::rename(from, to).await
    })
    .await
}

pub(crate) async fn move_output_with<F, Fut>(temp: &Path, dest: &Path, rename: F) -> Placement
where
    F: FnOnce(PathBuf, PathBuf) -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    tracing::info!("Renaming {} to {}", temp.display(), dest.display());

    let rename_err = match rename(temp.to_path_buf(), dest.to_path_buf()).await {
        Ok(()) => return Placement::Renamed(dest.to_path_buf()),
        Err(e) => e,
    };

    tracing::warn!(
        error = %rename_err,
        "Rename failed, copying {} instead",
        temp.display()
    );

    match copy_then_remove(temp, dest).await {
        Ok(()) => Placement::Copied(dest.to_path_buf()),
        Err(e) => {
            tracing::error!(
                error = %e,
                "Copy failed, leaving output at {}",
                temp.display()
            );
            Placement::Stranded {
                temp: temp.to_path_buf(),
                reason: e.to_string(),
            }
        }
    }
}

async fn copy_then_remove(temp: &Path, dest: &Path) -> io::Result<()> {
    let mut source = tokio::fs::File::open(temp).await?;
    let mut target = tokio::fs::File::create(dest).await?;
    tokio::io::copy(&mut source, &mut target).await?;
    target.flush().await?;
    target.sync_all().await?;
    drop(source);
    tokio::fs::remove_file(temp).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cross_device(_: PathBuf, _: PathBuf) -> std::future::Ready<io::Result<()>> {
        std::future::ready(Err(io::Error::other("Invalid cross-device link (os error 18)")))
    }

    #[tokio::test]
    async fn rename_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("movie.m4v.tmp");
        let dest = dir.path().join("movie.m4v");
        std::fs::write(&temp, b"encoded").unwrap();

        let placement = move_output(&temp, &dest).await;
        assert_eq!(placement, Placement::Renamed(dest.clone()));
        assert_eq!(std::fs::read(&dest).unwrap(), b"encoded");
        assert!(!temp.exists());
    }

    #[tokio::test]
    async fn cross_device_rename_falls_back_to_copy() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("movie.m4v.tmp");
        let dest = dir.path().join("out").join("movie.m4v");
        std::fs::create_dir(dir.path().join("out")).unwrap();
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&temp, &content).unwrap();

        let placement = move_output_with(&temp, &dest, cross_device).await;
        assert_eq!(placement, Placement::Copied(dest.clone()));
        assert_eq!(std::fs::read(&dest).unwrap(), content);
        assert!(!temp.exists());
    }

    #[tokio::test]
    async fn failed_copy_leaves_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("movie.m4v.tmp");
        let dest = dir.path().join("missing-dir").join("movie.m4v");
        std::fs::write(&temp, b"encoded").unwrap();

        let placement = move_output_with(&temp, &dest, cross_device).await;
        assert!(!placement.is_delivered());
        assert_eq!(placement.path(), temp.as_path());
        assert!(temp.exists());
    }
}
