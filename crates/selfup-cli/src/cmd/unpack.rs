//! `selfup unpack <file>`

use std::path::Path;

use anyhow::{Context as _, Result};
use selfup_core::{Reporter, UpdateSession};

use super::Context;

/// Extract `file` and print the new executable's path.
///
/// The installed manifest supplies the application name and `execPath`.
pub async fn unpack(ctx: &Context, file: &Path) -> Result<()> {
    let updater = ctx.updater()?;

    if ctx.dry_run {
        let dir = selfup_core::fsops::unpack_dir_for(&ctx.config.temp_dir, file)
            .with_context(|| format!("Not an archive path: {}", file.display()))?;
        ctx.output
            .info(&format!("Dry run, would unpack into {}", dir.display()));
        return Ok(());
    }

    tracing::debug!("Unpacking {}", file.display());
    let mut session = UpdateSession::default();
    let executable = updater
        .unpack_file(&mut session, file, updater.local())
        .await
        .with_context(|| format!("Failed to unpack {}", file.display()))?;
    println!("{}", executable.display());
    Ok(())
}
