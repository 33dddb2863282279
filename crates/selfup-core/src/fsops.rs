//! Filesystem primitives the installer drives.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Delete and recursive-copy operations, injectable so install policies can
/// be exercised against simulated lock contention.
#[async_trait]
pub trait FileOps: Send + Sync {
    /// Delete `path` and everything beneath it. A missing path is success.
    async fn remove_all(&self, path: &Path) -> io::Result<()>;

    /// Copy the contents of directory `from` into `to`, overwriting.
    async fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileOps;

#[async_trait]
impl FileOps for LocalFileOps {
    async fn remove_all(&self, path: &Path) -> io::Result<()> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || force_remove(&path))
            .await
            .map_err(io::Error::other)?
    }

    async fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
        let (from, to) = (from.to_path_buf(), to.to_path_buf());
        tokio::task::spawn_blocking(move || copy_dir_contents(&from, &to))
            .await
            .map_err(io::Error::other)?
    }
}

/// Remove a file, symlink, or directory tree. Missing paths are ignored.
///
/// # Errors
///
/// Returns the underlying I/O error if the path exists but cannot be removed.
pub fn force_remove(path: &Path) -> io::Result<()> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let result = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn copy_dir_contents(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::create_dir_all(to)?;

    let mut options = fs_extra::dir::CopyOptions::new();
    options.overwrite = true;
    options.content_only = true;

    fs_extra::dir::copy(from, to, &options)
        .map(|_| ())
        .map_err(|e| io::Error::other(format!("{}: {e}", display_pair(from, to))))
}

fn display_pair(from: &Path, to: &Path) -> String {
    format!("{} -> {}", from.display(), to.display())
}

/// `<dir>/<file stem>`: the unpack directory for an archive.
///
/// Only the last extension is dropped, so `app.tar.gz` unpacks into `app.tar`.
pub fn unpack_dir_for(temp_dir: &Path, archive: &Path) -> Option<PathBuf> {
    archive.file_stem().map(|stem| temp_dir.join(stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remove_all_handles_files_dirs_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file.txt");
        let dir = tmp.path().join("tree");
        std::fs::write(&file, "x").unwrap();
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("nested/leaf"), "y").unwrap();

        LocalFileOps.remove_all(&file).await.unwrap();
        LocalFileOps.remove_all(&dir).await.unwrap();
        LocalFileOps.remove_all(&tmp.path().join("never-existed")).await.unwrap();

        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn copy_dir_merges_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let from = tmp.path().join("from");
        let to = tmp.path().join("to");
        std::fs::create_dir_all(from.join("lib")).unwrap();
        std::fs::write(from.join("app"), "new").unwrap();
        std::fs::write(from.join("lib/core.so"), "lib").unwrap();
        std::fs::create_dir_all(&to).unwrap();
        std::fs::write(to.join("app"), "old").unwrap();

        LocalFileOps.copy_dir(&from, &to).await.unwrap();

        assert_eq!(std::fs::read_to_string(to.join("app")).unwrap(), "new");
        assert_eq!(std::fs::read_to_string(to.join("lib/core.so")).unwrap(), "lib");
        assert!(!to.join("from").exists());
    }

    #[tokio::test]
    async fn copy_from_missing_dir_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let err = LocalFileOps
            .copy_dir(&tmp.path().join("absent"), &tmp.path().join("to"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    fn unpack_dir_drops_last_extension() {
        let tmp = Path::new("/tmp/selfup");
        assert_eq!(
            unpack_dir_for(tmp, Path::new("/tmp/selfup/app-1.2.0.zip")),
            Some(tmp.join("app-1.2.0"))
        );
        assert_eq!(
            unpack_dir_for(tmp, Path::new("app.tar.gz")),
            Some(tmp.join("app.tar"))
        );
    }
}
