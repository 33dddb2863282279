//! `selfup run <exe> [args..]`

use std::path::Path;

use anyhow::{Context as _, Result};
use selfup_core::{AppLocation, LaunchOptions, Launcher, Reporter};

use super::Context;

/// Start `exe` detached and print its pid.
pub fn run(ctx: &Context, exe: &Path, args: &[String]) -> Result<()> {
    let launcher = Launcher::new(ctx.platform, AppLocation::current()?);

    if ctx.dry_run {
        let cmd = launcher.command(exe, args, &LaunchOptions::default());
        ctx.output.info(&format!("Dry run, would run {cmd:?}"));
        return Ok(());
    }

    tracing::debug!("Launching {} with {} args", exe.display(), args.len());
    let launched = launcher
        .run(exe, args, &LaunchOptions::default())
        .with_context(|| format!("Failed to launch {}", exe.display()))?;
    ctx.output
        .success(&format!("Started {} (pid {})", exe.display(), launched.pid));
    println!("{}", launched.pid);
    Ok(())
}
