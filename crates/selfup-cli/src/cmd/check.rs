//! `selfup check`

use anyhow::{Context as _, Result};
use selfup_core::Reporter;

use super::Context;

/// Compare the installed version with the published one.
pub async fn check(ctx: &Context) -> Result<()> {
    let updater = ctx.updater()?;
    let local = updater.local();
    ctx.output
        .info(&format!("Checking {} for updates...", local.manifest_url));

    let result = updater
        .check()
        .await
        .context("Failed to check for updates")?;
    tracing::debug!(
        local = %local.version,
        remote = %result.remote.version,
        has_update = result.has_update,
        "Compared versions"
    );

    if result.has_update {
        ctx.output.warning(&format!(
            "Update available: {} -> {}",
            local.version, result.remote.version
        ));
        println!("update available: {} -> {}", local.version, result.remote.version);
    } else {
        ctx.output
            .success(&format!("{} is up to date (v{})", local.name, local.version));
        println!("up to date: {}", local.version);
    }
    Ok(())
}
