//! Archive extraction
//!
//! [`CommandExtractor`] drives the platform's extraction tool the way a
//! shipped application does. [`ArchiveExtractor`] unpacks in-process with the
//! `zip` / `tar` crates for hosts without those tools.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use selfup_schema::Platform;
use tracing::debug;
use zip::ZipArchive;

use crate::error::UpdateError;

/// Unpacks an archive into a directory.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract `archive` into the existing directory `dest`.
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), UpdateError>;
}

/// Archive formats selfup knows how to unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.zip`
    Zip,
    /// `.tar.gz` / `.tgz`
    TarGz,
}

impl ArchiveFormat {
    /// Detect the format from the file name. Unknown names fall back to zip,
    /// the format every platform's packages ship in by default.
    pub fn detect(path: &Path) -> Self {
        let name = path.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Self::TarGz
        } else {
            Self::Zip
        }
    }
}

/// Runs the external extraction tool for a platform.
///
/// - macOS / Linux zip: `unzip -xo <archive>` inside the destination
/// - macOS / Linux tar.gz: `tar -zxf <archive>` inside the destination
/// - Windows: the bundled `unzip.exe -u -o <archive> -d <dest>`
///
/// Tool output on stdout is discarded; stderr is kept for the error message.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    platform: Platform,
    unzip_tool: PathBuf,
}

impl CommandExtractor {
    /// `unzip_tool` is only used on Windows.
    pub fn new(platform: Platform, unzip_tool: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            unzip_tool: unzip_tool.into(),
        }
    }

    /// Build the extraction command without running it.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Extraction`] if the required tool is not
    /// installed or the archive path cannot be made absolute.
    pub fn command(
        &self,
        archive: &Path,
        dest: &Path,
    ) -> Result<tokio::process::Command, UpdateError> {
        // The tools run with `dest` as cwd, so a relative archive path would
        // resolve against the wrong directory.
        let archive = std::path::absolute(archive)
            .map_err(|e| UpdateError::Extraction(format!("{}: {e}", archive.display())))?;

        let cmd = match self.platform {
            Platform::Windows => {
                // NOTE: the bundled unzip.exe is not code-signed. It runs with
                // the updater's privileges on whatever archive was downloaded.
                let mut cmd = tokio::process::Command::new(&self.unzip_tool);
                cmd.args(["-u", "-o"]).arg(&archive).arg("-d").arg(dest);
                cmd
            }
            Platform::Mac | Platform::Linux => match ArchiveFormat::detect(&archive) {
                ArchiveFormat::Zip => {
                    let mut cmd = tokio::process::Command::new(find_tool("unzip")?);
                    cmd.arg("-xo").arg(&archive).current_dir(dest);
                    cmd
                }
                ArchiveFormat::TarGz => {
                    let mut cmd = tokio::process::Command::new(find_tool("tar")?);
                    cmd.arg("-zxf").arg(&archive).current_dir(dest);
                    cmd
                }
            },
        };
        Ok(cmd)
    }
}

fn find_tool(name: &str) -> Result<PathBuf, UpdateError> {
    which::which(name).map_err(|e| UpdateError::Extraction(format!("{name} not found: {e}")))
}

#[async_trait]
impl Extractor for CommandExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), UpdateError> {
        let mut cmd = self.command(archive, dest)?;
        debug!(?cmd, "running extractor");

        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| UpdateError::Extraction(e.to_string()))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        Err(UpdateError::Extraction(if stderr.is_empty() {
            format!("extractor exited with {}", output.status)
        } else {
            stderr.to_string()
        }))
    }
}

/// In-process extraction backed by the `zip`, `tar`, and `flate2` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor;

#[async_trait]
impl Extractor for ArchiveExtractor {
    async fn extract(&self, archive: &Path, dest: &Path) -> Result<(), UpdateError> {
        let (archive, dest) = (archive.to_path_buf(), dest.to_path_buf());
        tokio::task::spawn_blocking(move || match ArchiveFormat::detect(&archive) {
            ArchiveFormat::Zip => extract_zip(&archive, &dest),
            ArchiveFormat::TarGz => extract_tar_gz(&archive, &dest),
        })
        .await
        .map_err(|e| UpdateError::Extraction(e.to_string()))?
        .map_err(|e| UpdateError::Extraction(e.to_string()))
    }
}

fn extract_zip(archive_path: &Path, dest_dir: &Path) -> io::Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(io::Error::other)?;

    fs::create_dir_all(dest_dir)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(io::Error::other)?;
        // Entries escaping the destination (zip slip) have no enclosed name.
        let Some(relative_path) = entry.enclosed_name() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid path in archive: {}", entry.name()),
            ));
        };
        let absolute_path = dest_dir.join(relative_path);

        if entry.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            continue;
        }

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode))?;
        }
    }

    Ok(())
}

fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> io::Result<()> {
    let file = File::open(archive_path)?;
    let decoder = flate2::read::GzDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);

    fs::create_dir_all(dest_dir)?;

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.unpack_in(dest_dir)? {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid path in archive: {}", entry.path()?.display()),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Write;
    use std::path::Path;

    /// Write a zip with the given `(path, contents)` entries. Paths ending in
    /// `/` become directories.
    pub(crate) fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
        for (name, contents) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(contents.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    /// Write a gzipped tar with the given `(path, contents)` files.
    pub(crate) fn write_tar_gz(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, name, contents.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{write_tar_gz, write_zip};
    use super::*;

    #[test]
    fn detects_formats() {
        assert_eq!(ArchiveFormat::detect(Path::new("a.tar.gz")), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::detect(Path::new("a.TGZ")), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::detect(Path::new("a.zip")), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::detect(Path::new("a.nw")), ArchiveFormat::Zip);
    }

    #[tokio::test]
    async fn archive_extractor_unpacks_zip() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("app.zip");
        write_zip(&archive, &[("MyApp.app/", ""), ("MyApp.app/Contents/Info.plist", "plist")]);

        let dest = tmp.path().join("out");
        ArchiveExtractor.extract(&archive, &dest).await.unwrap();
        assert_eq!(
            fs::read_to_string(dest.join("MyApp.app/Contents/Info.plist")).unwrap(),
            "plist"
        );
    }

    #[tokio::test]
    async fn archive_extractor_unpacks_tar_gz() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("app.tar.gz");
        write_tar_gz(&archive, &[("myapp", "#!/bin/sh\n"), ("lib/data.bin", "data")]);

        let dest = tmp.path().join("out");
        ArchiveExtractor.extract(&archive, &dest).await.unwrap();
        assert_eq!(fs::read_to_string(dest.join("lib/data.bin")).unwrap(), "data");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dest.join("myapp")).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[tokio::test]
    async fn archive_extractor_reports_corrupt_archive() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("broken.zip");
        fs::write(&archive, "not a zip").unwrap();

        let err = ArchiveExtractor.extract(&archive, tmp.path()).await.unwrap_err();
        assert!(matches!(err, UpdateError::Extraction(_)));
    }

    #[cfg(unix)]
    #[test]
    fn windows_command_uses_bundled_unzip() {
        let extractor = CommandExtractor::new(Platform::Windows, "C:/app/tools/unzip.exe");
        let cmd = extractor
            .command(Path::new("/tmp/app.zip"), Path::new("/tmp/app"))
            .unwrap();
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "C:/app/tools/unzip.exe");
        let args: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(args, ["-u", "-o", "/tmp/app.zip", "-d", "/tmp/app"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_extractor_runs_tar() {
        if which::which("tar").is_err() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("app.tar.gz");
        write_tar_gz(&archive, &[("myapp", "bin")]);
        let dest = tmp.path().join("app.tar");
        fs::create_dir_all(&dest).unwrap();

        CommandExtractor::new(Platform::Linux, "unused")
            .extract(&archive, &dest)
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(dest.join("myapp")).unwrap(), "bin");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_extractor_surfaces_tool_error() {
        if which::which("tar").is_err() {
            return;
        }
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("broken.tar.gz");
        fs::write(&archive, "garbage").unwrap();

        let err = CommandExtractor::new(Platform::Linux, "unused")
            .extract(&archive, tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::Extraction(msg) if !msg.is_empty()));
    }
}
