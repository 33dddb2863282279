//! Per-platform unpacking of a downloaded package.

use std::path::{Component, Path, PathBuf};

use selfup_schema::{Manifest, Platform, PlatformKey};
use tracing::{debug, info, warn};

use crate::config::UpdaterConfig;
use crate::error::UpdateError;
use crate::extract::{CommandExtractor, Extractor};
use crate::fsops::{FileOps, LocalFileOps, unpack_dir_for};
use crate::reporter::{NullReporter, Reporter};

/// Extracts a package into `<temp_dir>/<archive stem>` and locates the new
/// executable inside it.
///
/// | Platform | Existing unpack dir | Resolved path                        |
/// |----------|---------------------|--------------------------------------|
/// | mac      | reused              | `<dir>/<execPath or name.app>`       |
/// | linux    | reused              | `<dir>` (executable found at launch) |
/// | win      | deleted first       | `<dir>/<execPath or name.exe>`       |
#[derive(Debug, Clone)]
pub struct PlatformUnpacker<
    E: Extractor = CommandExtractor,
    R: Reporter = NullReporter,
    F: FileOps = LocalFileOps,
> {
    platform: PlatformKey,
    temp_dir: PathBuf,
    extractor: E,
    reporter: R,
    fs: F,
}

impl PlatformUnpacker<CommandExtractor> {
    /// Unpacker using the platform's extraction tool.
    pub fn new(platform: PlatformKey, config: &UpdaterConfig) -> Self {
        Self {
            platform,
            temp_dir: config.temp_dir.clone(),
            extractor: CommandExtractor::new(platform.family(), config.unzip_tool.clone()),
            reporter: NullReporter,
            fs: LocalFileOps,
        }
    }
}

impl<E: Extractor> PlatformUnpacker<E> {
    /// Unpacker with a custom extractor.
    pub fn with_extractor(
        platform: PlatformKey,
        temp_dir: impl Into<PathBuf>,
        extractor: E,
    ) -> Self {
        Self {
            platform,
            temp_dir: temp_dir.into(),
            extractor,
            reporter: NullReporter,
            fs: LocalFileOps,
        }
    }
}

impl<E: Extractor, R: Reporter, F: FileOps> PlatformUnpacker<E, R, F> {
    /// Report extraction to `reporter`.
    pub fn with_reporter<R2: Reporter>(self, reporter: R2) -> PlatformUnpacker<E, R2, F> {
        PlatformUnpacker {
            platform: self.platform,
            temp_dir: self.temp_dir,
            extractor: self.extractor,
            reporter,
            fs: self.fs,
        }
    }

    /// Clear stale unpack directories through `fs`.
    pub fn with_file_ops<F2: FileOps>(self, fs: F2) -> PlatformUnpacker<E, R, F2> {
        PlatformUnpacker {
            platform: self.platform,
            temp_dir: self.temp_dir,
            extractor: self.extractor,
            reporter: self.reporter,
            fs,
        }
    }

    /// Directory `archive` unpacks into.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Configuration`] if the path has no file name.
    pub fn unpack_dir(&self, archive: &Path) -> Result<PathBuf, UpdateError> {
        unpack_dir_for(&self.temp_dir, archive).ok_or_else(|| {
            UpdateError::Configuration(format!("not an archive path: {}", archive.display()))
        })
    }

    /// Extract `archive` and return the path of the new executable.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::Configuration`] if the package's `execPath` is not a
    ///   relative path inside the package
    /// - [`UpdateError::Filesystem`] if the unpack directory cannot be
    ///   created, or on Windows cannot be cleared
    /// - [`UpdateError::Extraction`] if the extractor fails
    pub async fn unpack(
        &self,
        archive: &Path,
        manifest: &Manifest,
    ) -> Result<PathBuf, UpdateError> {
        let dest = self.unpack_dir(archive)?;
        let family = self.platform.family();

        let exec_path = manifest
            .package(self.platform)
            .and_then(|p| p.exec_path.as_deref());
        if let Some(exec_path) = exec_path {
            check_exec_path(exec_path)?;
        }

        if family == Platform::Windows {
            // Windows holds files locked long enough that a leftover extract
            // may be half-written. Never reuse it.
            self.fs
                .remove_all(&dest)
                .await
                .map_err(|e| UpdateError::fs(format!("Failed to clear {}", dest.display()), e))?;
        }

        tokio::fs::create_dir_all(&dest)
            .await
            .map_err(|e| UpdateError::fs(format!("Failed to create {}", dest.display()), e))?;

        info!(archive = %archive.display(), dest = %dest.display(), "unpacking");
        self.reporter.extracting(&manifest.name, &dest);

        if let Err(e) = self.extractor.extract(archive, &dest).await {
            self.reporter.failed(&manifest.name, &e.to_string());
            return Err(e);
        }

        let resolved = match family {
            Platform::Mac => dest.join(exec_path.map_or_else(
                || PathBuf::from(format!("{}.app", manifest.name)),
                Path::to_path_buf,
            )),
            Platform::Windows => dest.join(exec_path.map_or_else(
                || PathBuf::from(format!("{}.exe", manifest.name)),
                Path::to_path_buf,
            )),
            Platform::Linux => dest,
        };

        if resolved.exists() {
            debug!(path = %resolved.display(), "resolved new executable");
        } else {
            warn!(path = %resolved.display(), "resolved executable missing from package");
        }
        self.reporter.done(&manifest.name, "unpacked", None);

        Ok(resolved)
    }
}

/// `execPath` must name something inside the unpack directory: relative,
/// with no `..`, root or prefix components.
fn check_exec_path(exec_path: &Path) -> Result<(), UpdateError> {
    let inside = exec_path.components().next().is_some()
        && exec_path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if inside {
        Ok(())
    } else {
        Err(UpdateError::Configuration(format!(
            "execPath must be a relative path inside the package: {}",
            exec_path.display()
        )))
    }
}
