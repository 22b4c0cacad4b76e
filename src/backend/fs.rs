//! Local file access for the workflow.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem operations the workflow needs.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// `Ok(false)` only when the path is definitely absent; a failed stat
    /// (permission denied, …) is an error.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Size in bytes of a regular file.
    async fn size(&self, path: &Path) -> io::Result<u64>;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write `bytes` to `path`, creating missing parent directories.
    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
}

/// Default [`FileSystem`] on top of `tokio::fs`.
///
/// Writes go to a sibling `.part` file which is then renamed over the
/// target, so a failed write never leaves a truncated file behind.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        tokio::fs::try_exists(path).await
    }

    async fn size(&self, path: &Path) -> io::Result<u64> {
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is not a regular file", path.display()),
            ));
        }
        Ok(meta.len())
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = part_path(path);
        if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e);
        }

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

/// `out/photo.jpg` → `out/photo.jpg.part`
fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("out/photo.jpg")),
            PathBuf::from("out/photo.jpg.part")
        );
    }

    #[tokio::test]
    async fn write_creates_parents_and_leaves_no_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/c/out.webp");
        let fs = TokioFileSystem;

        fs.write(&target, b"RIFF....WEBP").await.unwrap();

        assert!(fs.exists(&target).await.unwrap());
        assert_eq!(fs.size(&target).await.unwrap(), 12);
        assert!(!fs.exists(&part_path(&target)).await.unwrap());
        assert_eq!(fs.read(&target).await.unwrap(), b"RIFF....WEBP");
    }

    #[tokio::test]
    async fn write_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.jpg");
        let fs = TokioFileSystem;

        fs.write(&target, b"first version").await.unwrap();
        fs.write(&target, b"second").await.unwrap();
        assert_eq!(fs.read(&target).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn size_rejects_directories() {
        let dir = tempfile::tempdir().unwrap();
        let err = TokioFileSystem.size(dir.path()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn missing_file_does_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!TokioFileSystem
            .exists(&dir.path().join("nope.png"))
            .await
            .unwrap());
    }
}
