//! `selfup update`

use anyhow::{Context as _, Result};
use selfup_core::{LaunchOptions, Reporter, UpdateSession};

use super::Context;

/// Check, download, unpack, and hand over to the new version.
///
/// The new instance receives `[app root, running exe]` and is expected to
/// run `install` against that location once this process exits.
pub async fn update(ctx: &Context) -> Result<()> {
    let updater = ctx.updater()?;

    if ctx.dry_run {
        let check = updater
            .check()
            .await
            .context("Failed to check for updates")?;
        if check.has_update {
            ctx.output.info(&format!(
                "Dry run, would update {} -> {}",
                updater.local().version,
                check.remote.version
            ));
        } else {
            ctx.output.success("Already up to date");
        }
        return Ok(());
    }

    let mut session = UpdateSession::default();
    match updater
        .update(&mut session, &LaunchOptions::default())
        .await
        .context("Update failed")?
    {
        Some(launched) => {
            tracing::info!(pid = launched.pid, "Handed over to new version");
            ctx.output.success(&format!(
                "Started new version (pid {}), exit to let it install",
                launched.pid
            ));
            println!("{}", launched.pid);
        }
        None => {
            tracing::debug!("No update available");
            println!("up to date: {}", updater.local().version);
        }
    }
    Ok(())
}
