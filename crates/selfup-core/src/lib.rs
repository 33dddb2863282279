//! selfup core: the stages of an application self-update.
//!
//! [`ManifestClient`] decides whether a newer release exists,
//! [`PackageDownloader`] fetches its package, [`PlatformUnpacker`] extracts it,
//! [`Installer`] copies it over the old installation and [`Launcher`] starts
//! the result. [`Updater`] runs them in sequence.

pub mod check;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod fsops;
pub mod install;
pub mod launch;
pub mod reporter;
pub mod unpack;
pub mod updater;

pub use check::{ManifestClient, VersionCheck};
pub use config::{AppLocation, UpdaterConfig};
pub use download::{DownloadHandle, DownloadProgress, PackageDownloader};
pub use error::UpdateError;
pub use extract::{ArchiveExtractor, CommandExtractor, Extractor};
pub use fsops::{FileOps, LocalFileOps};
pub use install::{InstallPolicy, InstallState, Installer, Sleeper, TokioSleeper};
pub use launch::{LaunchOptions, LaunchedProcess, Launcher};
pub use reporter::{NullReporter, Reporter};
pub use unpack::PlatformUnpacker;
pub use updater::{UpdateSession, Updater};

pub use selfup_schema::{Manifest, PackageDescriptor, Platform, PlatformKey};

/// User Agent string
pub const USER_AGENT: &str = concat!("selfup/", env!("CARGO_PKG_VERSION"));

/// Extract the filename from a URL, ignoring any query string or fragment.
///
/// # Example
///
/// ```
/// use selfup_core::filename_from_url;
///
/// assert_eq!(filename_from_url("https://example.com/dl/app-1.2.0.zip"), "app-1.2.0.zip");
/// assert_eq!(filename_from_url("https://example.com/app.tar.gz?token=abc#top"), "app.tar.gz");
/// assert_eq!(filename_from_url("https://example.com/dir/"), "");
/// ```
pub fn filename_from_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].split('/').next_back().unwrap_or("")
}
