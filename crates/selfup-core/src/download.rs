//! Streaming package download with abort support.
//!
//! The transfer runs on its own task and writes straight to
//! `<temp_dir>/<url basename>`. Callers get a [`DownloadHandle`] they can
//! abort or await; completion resolves at most once.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use futures::StreamExt;
use reqwest::Client;
use selfup_schema::{Manifest, PlatformKey};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::UpdateError;
use crate::reporter::{NullReporter, Reporter};

/// Byte counters for an in-flight download. Cheap to clone and still
/// readable after the handle has been awaited.
#[derive(Debug, Clone, Default)]
pub struct DownloadProgress {
    inner: Arc<ProgressInner>,
}

#[derive(Debug, Default)]
struct ProgressInner {
    content_length: OnceLock<Option<u64>>,
    received: AtomicU64,
}

impl DownloadProgress {
    /// `content-length` from the response headers. `None` until headers
    /// arrive, or when the server did not send one.
    pub fn content_length(&self) -> Option<u64> {
        self.inner.content_length.get().copied().flatten()
    }

    /// Body bytes written to disk so far
    pub fn bytes_received(&self) -> u64 {
        self.inner.received.load(Ordering::Relaxed)
    }

    fn record_headers(&self, content_length: Option<u64>) {
        let _ = self.inner.content_length.set(content_length);
    }

    fn add(&self, len: u64) -> u64 {
        self.inner.received.fetch_add(len, Ordering::Relaxed) + len
    }
}

/// Handle to a running download.
#[derive(Debug)]
pub struct DownloadHandle {
    dest: PathBuf,
    cancel: CancellationToken,
    progress: DownloadProgress,
    task: JoinHandle<Result<PathBuf, UpdateError>>,
}

impl DownloadHandle {
    /// Where the package is being written
    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Live byte counters
    pub fn progress(&self) -> DownloadProgress {
        self.progress.clone()
    }

    /// Stop the transfer. Once called, [`wait`](Self::wait) can no longer
    /// succeed, even if the body was already fully received.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// Token that aborts this download when cancelled. Lets another task
    /// abort while this handle is being awaited.
    pub fn abort_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether [`abort`](Self::abort) has been called
    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the transfer to finish.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::HttpStatus`] if the server answered outside 200-299
    /// - [`UpdateError::Network`] on transport failure
    /// - [`UpdateError::Filesystem`] if the file cannot be written
    /// - [`UpdateError::Aborted`] if the download was aborted
    pub async fn wait(self) -> Result<PathBuf, UpdateError> {
        match self.task.await {
            // The transfer may have finished before `abort` was called.
            Ok(Ok(path)) if self.cancel.is_cancelled() => {
                tokio::fs::remove_file(&path).await.ok();
                Err(UpdateError::Aborted)
            }
            Ok(result) => result,
            Err(e) => Err(UpdateError::fs(
                "Download task failed",
                std::io::Error::other(e),
            )),
        }
    }
}

/// Downloads the package for one platform into the shared temp directory.
#[derive(Debug, Clone)]
pub struct PackageDownloader<R: Reporter + Clone + 'static = NullReporter> {
    client: Client,
    platform: PlatformKey,
    temp_dir: PathBuf,
    reporter: R,
}

impl PackageDownloader<NullReporter> {
    /// Create a silent downloader.
    pub fn new(client: Client, platform: PlatformKey, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            platform,
            temp_dir: temp_dir.into(),
            reporter: NullReporter,
        }
    }
}

impl<R: Reporter + Clone + 'static> PackageDownloader<R> {
    /// Report progress to `reporter`.
    pub fn with_reporter<R2>(self, reporter: R2) -> PackageDownloader<R2>
    where
        R2: Reporter + Clone + 'static,
    {
        PackageDownloader {
            client: self.client,
            platform: self.platform,
            temp_dir: self.temp_dir,
            reporter,
        }
    }

    /// Resolve the package URL for this platform and its destination path.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Configuration`] if the manifest has no package
    /// for this platform or the URL has no file name.
    pub fn resolve<'m>(&self, manifest: &'m Manifest) -> Result<(&'m str, PathBuf), UpdateError> {
        let package = manifest.package(self.platform).ok_or_else(|| {
            UpdateError::Configuration(format!(
                "manifest for {} {} has no package for {}",
                manifest.name, manifest.version, self.platform
            ))
        })?;

        let filename = crate::filename_from_url(&package.url);
        if filename.is_empty() {
            return Err(UpdateError::Configuration(format!(
                "package URL has no file name: {}",
                package.url
            )));
        }

        Ok((&package.url, self.temp_dir.join(filename)))
    }

    /// Start downloading the platform package.
    ///
    /// Any file already at the destination is removed before the request is
    /// sent. The returned handle resolves to the destination path.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Configuration`] for a missing platform package
    /// and [`UpdateError::Filesystem`] if the temp directory cannot be
    /// prepared.
    pub async fn start(&self, manifest: &Manifest) -> Result<DownloadHandle, UpdateError> {
        let (url, dest) = self.resolve(manifest)?;

        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .map_err(|e| {
                UpdateError::fs(format!("Failed to create {}", self.temp_dir.display()), e)
            })?;
        remove_stale(&dest).await?;

        let cancel = CancellationToken::new();
        let progress = DownloadProgress::default();

        info!(%url, dest = %dest.display(), "starting download");

        let transfer = Transfer {
            client: self.client.clone(),
            url: url.to_string(),
            dest: dest.clone(),
            label: manifest.name.clone(),
            progress: progress.clone(),
            reporter: self.reporter.clone(),
        };
        let task = tokio::spawn(transfer.run(cancel.clone()));

        Ok(DownloadHandle {
            dest,
            cancel,
            progress,
            task,
        })
    }

    /// Download the platform package and wait for it.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start) and [`DownloadHandle::wait`].
    pub async fn download(&self, manifest: &Manifest) -> Result<PathBuf, UpdateError> {
        self.start(manifest).await?.wait().await
    }
}

/// Remove a previous download at `dest`. A missing file is fine.
async fn remove_stale(dest: &Path) -> Result<(), UpdateError> {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => {
            debug!(path = %dest.display(), "removed previous download");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(UpdateError::fs(
            format!("Failed to remove {}", dest.display()),
            e,
        )),
    }
}

struct Transfer<R> {
    client: Client,
    url: String,
    dest: PathBuf,
    label: String,
    progress: DownloadProgress,
    reporter: R,
}

impl<R: Reporter> Transfer<R> {
    async fn run(self, cancel: CancellationToken) -> Result<PathBuf, UpdateError> {
        let result = match self.stream_to_file(&cancel).await {
            Ok(()) => {
                // Completion is delivered one tick after the stream ends so the
                // caller is never re-entered from inside the body stream.
                tokio::task::yield_now().await;
                if cancel.is_cancelled() {
                    Err(UpdateError::Aborted)
                } else {
                    Ok(())
                }
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                let size = self.progress.bytes_received();
                self.reporter.done(&self.label, "downloaded", Some(size));
                info!(dest = %self.dest.display(), size, "download complete");
                Ok(self.dest)
            }
            Err(e) => {
                // A partial or rejected transfer never counts as a valid file.
                tokio::fs::remove_file(&self.dest).await.ok();
                warn!(url = %self.url, error = %e, "download failed");
                self.reporter.failed(&self.label, &e.to_string());
                Err(e)
            }
        }
    }

    /// Streams the body to `dest`. Only network reads race the cancel token;
    /// file writes always run to completion so nothing is left in flight
    /// when the caller deletes the partial file.
    async fn stream_to_file(&self, cancel: &CancellationToken) -> Result<(), UpdateError> {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(UpdateError::Aborted),
            r = self.client.get(&self.url).send() => r?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus(status.as_u16()));
        }

        let total = response.content_length();
        self.progress.record_headers(total);
        self.reporter.downloading(&self.label, 0, total);

        let mut file = File::create(&self.dest)
            .await
            .map_err(|e| self.fs_error("create", e))?;
        let mut stream = response.bytes_stream();

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                next = stream.next() => Some(next),
            };
            let Some(next) = next else {
                // Settle any buffered write before the file is dropped.
                file.flush().await.ok();
                return Err(UpdateError::Aborted);
            };
            let Some(chunk) = next else { break };

            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    file.flush().await.ok();
                    return Err(e.into());
                }
            };
            file.write_all(&chunk)
                .await
                .map_err(|e| self.fs_error("write", e))?;
            let received = self.progress.add(chunk.len() as u64);
            self.reporter.downloading(&self.label, received, total);
        }

        file.flush().await.map_err(|e| self.fs_error("flush", e))?;
        Ok(())
    }

    fn fs_error(&self, action: &str, source: std::io::Error) -> UpdateError {
        UpdateError::fs(format!("Failed to {action} {}", self.dest.display()), source)
    }
}
