//! `selfup platform`

use anyhow::Result;

use super::Context;

/// Print the platform key.
pub fn platform(ctx: &Context) -> Result<()> {
    println!("{}", ctx.platform);
    Ok(())
}
