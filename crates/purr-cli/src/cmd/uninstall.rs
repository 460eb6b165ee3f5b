//! Uninstall command

use anyhow::{Result, anyhow};

use crate::Context;

pub async fn uninstall(ctx: &Context, package: &str) -> Result<()> {
    ctx.installer()
        .uninstall(package)
        .await
        .map_err(|e| anyhow!("Uninstall failed ({}): {e}", e.category()))?;
    Ok(())
}
