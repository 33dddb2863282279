//! The update pipeline as one object.
//!
//! [`Updater`] wires the individual stages to a shared configuration, HTTP
//! client and reporter. Stage outputs are recorded in an [`UpdateSession`]
//! which the caller owns and passes back in, so the stages can also be run
//! across separate invocations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use selfup_schema::{Manifest, PlatformKey};
use tracing::info;

use crate::check::{ManifestClient, VersionCheck};
use crate::config::{AppLocation, UpdaterConfig};
use crate::download::{DownloadHandle, PackageDownloader};
use crate::error::UpdateError;
use crate::install::{InstallPolicy, Installer};
use crate::launch::{LaunchOptions, LaunchedProcess, Launcher};
use crate::reporter::{NullReporter, Reporter};
use crate::unpack::PlatformUnpacker;

/// Paths produced by the stages of one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSession {
    /// Override for [`UpdaterConfig::temp_dir`] in this session
    pub temp_dir: Option<PathBuf>,
    /// Downloaded package
    pub download_path: Option<PathBuf>,
    /// Where the package was extracted
    pub unpack_dir: Option<PathBuf>,
    /// The new application's executable or bundle
    pub executable: Option<PathBuf>,
}

/// Runs the check, download, unpack, install and launch stages for one
/// application.
#[derive(Clone)]
pub struct Updater {
    config: UpdaterConfig,
    platform: PlatformKey,
    location: AppLocation,
    client: reqwest::Client,
    local: Manifest,
    reporter: Arc<dyn Reporter>,
    policy: InstallPolicy,
}

impl std::fmt::Debug for Updater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Updater")
            .field("platform", &self.platform)
            .field("app", &self.local.name)
            .field("version", &self.local.version)
            .field("temp_dir", &self.config.temp_dir)
            .finish_non_exhaustive()
    }
}

impl Updater {
    /// Updater for the application described by `local`, running on this host.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built or the running executable
    /// cannot be located.
    pub fn new(local: Manifest, config: UpdaterConfig) -> Result<Self, UpdateError> {
        Ok(Self {
            client: config.http_client()?,
            platform: PlatformKey::current(),
            location: AppLocation::current()?,
            reporter: Arc::new(NullReporter),
            policy: InstallPolicy::default(),
            config,
            local,
        })
    }

    /// Act as if running on `platform`.
    pub fn with_platform(mut self, platform: PlatformKey) -> Self {
        self.platform = platform;
        self
    }

    /// Use `location` instead of the running process's.
    pub fn with_location(mut self, location: AppLocation) -> Self {
        self.location = location;
        self
    }

    /// Send stage notifications to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the Windows install retry policy.
    pub fn with_install_policy(mut self, policy: InstallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Platform the stages dispatch on
    pub fn platform(&self) -> PlatformKey {
        self.platform
    }

    /// Manifest of the running application
    pub fn local(&self) -> &Manifest {
        &self.local
    }

    /// Root directory of the running application
    pub fn app_root(&self) -> PathBuf {
        self.location.root(self.platform.family())
    }

    /// Arguments handed to the new application so it can install itself
    /// over this one: `[app root, running exe]`.
    pub fn relaunch_args(&self) -> Vec<String> {
        vec![
            self.app_root().display().to_string(),
            self.location.exe().display().to_string(),
        ]
    }

    fn temp_dir<'a>(&'a self, session: &'a UpdateSession) -> &'a Path {
        session.temp_dir.as_deref().unwrap_or(&self.config.temp_dir)
    }

    /// Compare the published manifest with the local one.
    ///
    /// # Errors
    ///
    /// See [`ManifestClient::check_new_version`].
    pub async fn check(&self) -> Result<VersionCheck, UpdateError> {
        self.reporter.section("Checking");
        ManifestClient::new(self.client.clone(), self.local.clone())
            .check_new_version()
            .await
    }

    /// Start downloading `manifest`'s package for this platform.
    ///
    /// # Errors
    ///
    /// See [`PackageDownloader::start`].
    pub async fn start_download(
        &self,
        session: &UpdateSession,
        manifest: &Manifest,
    ) -> Result<DownloadHandle, UpdateError> {
        self.reporter.section("Downloading");
        self.downloader(session).start(manifest).await
    }

    /// Download `manifest`'s package and record it in `session`.
    ///
    /// # Errors
    ///
    /// See [`PackageDownloader::start`] and [`DownloadHandle::wait`].
    pub async fn download(
        &self,
        session: &mut UpdateSession,
        manifest: &Manifest,
    ) -> Result<PathBuf, UpdateError> {
        let path = self.start_download(session, manifest).await?.wait().await?;
        session.download_path = Some(path.clone());
        Ok(path)
    }

    /// Where [`download`](Self::download) would write `manifest`'s package.
    ///
    /// # Errors
    ///
    /// See [`PackageDownloader::resolve`].
    pub fn download_target(
        &self,
        session: &UpdateSession,
        manifest: &Manifest,
    ) -> Result<(String, PathBuf), UpdateError> {
        self.downloader(session)
            .resolve(manifest)
            .map(|(url, path)| (url.to_string(), path))
    }

    fn downloader(&self, session: &UpdateSession) -> PackageDownloader<Arc<dyn Reporter>> {
        PackageDownloader::new(self.client.clone(), self.platform, self.temp_dir(session))
            .with_reporter(Arc::clone(&self.reporter))
    }

    /// Extract the session's download and record the new executable.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Configuration`] if nothing has been downloaded
    /// yet, otherwise see [`PlatformUnpacker::unpack`].
    pub async fn unpack(
        &self,
        session: &mut UpdateSession,
        manifest: &Manifest,
    ) -> Result<PathBuf, UpdateError> {
        let archive = session.download_path.clone().ok_or_else(|| {
            UpdateError::Configuration("no package has been downloaded in this session".into())
        })?;
        self.unpack_file(session, &archive, manifest).await
    }

    /// Extract `archive` and record the new executable in `session`.
    ///
    /// # Errors
    ///
    /// See [`PlatformUnpacker::unpack`].
    pub async fn unpack_file(
        &self,
        session: &mut UpdateSession,
        archive: &Path,
        manifest: &Manifest,
    ) -> Result<PathBuf, UpdateError> {
        self.reporter.section("Unpacking");
        let config = self.config.clone().with_temp_dir(self.temp_dir(session));
        let unpacker = PlatformUnpacker::new(self.platform, &config)
            .with_reporter(Arc::clone(&self.reporter));

        let executable = unpacker.unpack(archive, manifest).await?;
        session.unpack_dir = Some(unpacker.unpack_dir(archive)?);
        session.executable = Some(executable.clone());
        Ok(executable)
    }

    /// Copy the running application over `target`.
    ///
    /// # Errors
    ///
    /// See [`Installer::install`].
    pub async fn install(&self, target: &Path) -> Result<(), UpdateError> {
        self.reporter.section("Installing");
        self.reporter.installing(target);
        let installer = Installer::new(self.platform, self.app_root()).with_policy(self.policy);
        match installer.install(target).await {
            Ok(()) => {
                self.reporter.success(&format!("Installed into {}", target.display()));
                Ok(())
            }
            Err(e) => {
                self.reporter.failed(&self.local.name, &e.to_string());
                Err(e)
            }
        }
    }

    /// Start `app` detached.
    ///
    /// # Errors
    ///
    /// See [`Launcher::run`].
    pub fn run(
        &self,
        app: &Path,
        args: &[String],
        options: &LaunchOptions,
    ) -> Result<LaunchedProcess, UpdateError> {
        Launcher::new(self.platform, self.location.clone()).run(app, args, options)
    }

    /// Check, download, unpack, then launch the new version with
    /// [`relaunch_args`](Self::relaunch_args).
    ///
    /// Returns `Ok(None)` when already up to date.
    ///
    /// # Errors
    ///
    /// The first stage error, unchanged.
    pub async fn update(
        &self,
        session: &mut UpdateSession,
        options: &LaunchOptions,
    ) -> Result<Option<LaunchedProcess>, UpdateError> {
        let check = self.check().await?;
        if !check.has_update {
            self.reporter
                .info(&format!("{} {} is up to date", self.local.name, self.local.version));
            return Ok(None);
        }
        info!(from = %self.local.version, to = %check.remote.version, "update available");

        self.download(session, &check.remote).await?;
        let executable = self.unpack(session, &check.remote).await?;

        self.reporter.section("Relaunching");
        let launched = self.run(&executable, &self.relaunch_args(), options)?;
        Ok(Some(launched))
    }
}
