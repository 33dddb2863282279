//! `selfup download`

use anyhow::{Context as _, Result};
use selfup_core::{Reporter, UpdateSession};

use super::Context;

/// Download the newest package for this platform and print its path.
pub async fn download(ctx: &Context) -> Result<()> {
    let updater = ctx.updater()?;
    let check = updater
        .check()
        .await
        .context("Failed to check for updates")?;

    if !check.has_update {
        let local = updater.local();
        ctx.output
            .success(&format!("{} is up to date (v{})", local.name, local.version));
        return Ok(());
    }

    let mut session = UpdateSession::default();
    if ctx.dry_run {
        let (url, path) = updater.download_target(&session, &check.remote)?;
        ctx.output
            .info(&format!("Dry run, would download {url}"));
        println!("{}", path.display());
        return Ok(());
    }

    let path = updater
        .download(&mut session, &check.remote)
        .await
        .with_context(|| {
            format!("Failed to download {} {}", check.remote.name, check.remote.version)
        })?;
    tracing::info!("Downloaded {} to {}", check.remote.version, path.display());
    println!("{}", path.display());
    Ok(())
}
