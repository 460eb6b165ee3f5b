//! Install command and its update/upgrade/downgrade aliases

use anyhow::{Result, anyhow};
use purr_core::Operation;
use purr_core::repo::Checkout;

use crate::Context;

/// Install `spec` and its dependencies under `op`'s label.
///
/// The failing package and its error are already printed by the reporter, so
/// the returned error only names the operation and the failure category.
pub async fn install(ctx: &Context, op: Operation, spec: &str) -> Result<()> {
    let installer = ctx.installer();
    let installed = installer
        .run(op, spec)
        .await
        .map_err(|e| anyhow!("{} failed ({})", op.stage(), e.category()))?;

    let pins_failed = installed
        .iter()
        .filter(|i| matches!(i.checkout, Checkout::PinFailed(_)))
        .count();

    let count = installed.len();
    let mut summary = format!(
        "{count} package{} ready in {}",
        if count == 1 { "" } else { "s" },
        installer.packages_dir().display()
    );
    if pins_failed > 0 {
        summary.push_str(&format!(", {pins_failed} not at the requested version"));
    }
    ctx.output.success(&summary);
    Ok(())
}
