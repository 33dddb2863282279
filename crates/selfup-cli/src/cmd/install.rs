//! `selfup install <target>`

use std::path::Path;

use anyhow::{Context as _, Result};
use selfup_core::{AppLocation, Installer, Reporter};

use super::Context;

/// Copy the running application over `target`.
pub async fn install(ctx: &Context, target: &Path) -> Result<()> {
    let location = AppLocation::current()?;
    let installer = Installer::new(ctx.platform, location.root(ctx.platform.family()));

    if ctx.dry_run {
        ctx.output.info(&format!(
            "Dry run, would copy {} to {}",
            installer.app_root().display(),
            target.display()
        ));
        return Ok(());
    }

    tracing::info!(
        "Installing {} into {}",
        installer.app_root().display(),
        target.display()
    );
    ctx.output.section("Installing");
    ctx.output.installing(target);
    installer
        .install(target)
        .await
        .with_context(|| format!("Failed to install into {}", target.display()))?;
    ctx.output
        .success(&format!("Installed into {}", target.display()));
    Ok(())
}
