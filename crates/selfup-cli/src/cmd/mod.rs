//! Subcommand implementations.

pub mod check;
pub mod download;
pub mod install;
pub mod platform;
pub mod run;
pub mod unpack;
pub mod update;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use selfup_core::{Manifest, PlatformKey, Reporter, Updater, UpdaterConfig};

use crate::Cli;
use crate::ui::Output;

/// State shared by every subcommand, resolved once from the command line.
#[derive(Clone)]
pub struct Context {
    pub config: UpdaterConfig,
    pub platform: PlatformKey,
    pub manifest_path: PathBuf,
    pub dry_run: bool,
    pub output: Arc<Output>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("platform", &self.platform)
            .field("manifest_path", &self.manifest_path)
            .field("temp_dir", &self.config.temp_dir)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Apply command-line overrides on top of the environment.
    pub fn from_cli(cli: &Cli) -> Self {
        let mut config = UpdaterConfig::from_env();
        if let Some(dir) = &cli.temp_dir {
            config.temp_dir.clone_from(dir);
        }
        let ctx = Self {
            config,
            platform: cli.platform.unwrap_or_else(PlatformKey::current),
            manifest_path: cli.manifest.clone(),
            dry_run: cli.dry_run,
            output: Arc::new(Output::quiet(cli.quiet)),
        };
        tracing::debug!(?ctx, dry_run = ctx.dry_run, "Resolved context");
        ctx
    }

    /// The installed application's manifest.
    pub fn local_manifest(&self) -> Result<Manifest> {
        tracing::debug!("Loading manifest {}", self.manifest_path.display());
        Manifest::load(&self.manifest_path)
            .with_context(|| format!("Failed to load manifest {}", self.manifest_path.display()))
    }

    /// An updater for the installed application, reporting to the terminal.
    pub fn updater(&self) -> Result<Updater> {
        let reporter: Arc<dyn Reporter> = self.output.clone();
        Ok(Updater::new(self.local_manifest()?, self.config.clone())
            .context("Failed to initialize updater")?
            .with_platform(self.platform)
            .with_reporter(reporter))
    }
}
