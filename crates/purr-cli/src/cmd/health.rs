//! Health command

use anyhow::{Result, bail};
use purr_core::Stage;
use purr_schema::format_timestamp;

use crate::Context;

/// Check registry health. Unknown or unhealthy is a failure exit.
pub async fn health(ctx: &Context) -> Result<()> {
    let output = &ctx.output;
    output.step(Stage::Fetching.label(), "registry health");

    let Some(health) = ctx.registry.health().await else {
        bail!(
            "Registry health unknown: no registry answered ({})",
            ctx.registry.bases().join(", ")
        );
    };

    let summary = format!("Registry is {}", health.status);
    if health.is_healthy() {
        output.success(&summary);
    } else {
        output.warning(&summary);
    }
    output.field("Version", &health.version);
    output.field("Packages", &health.package_count.to_string());
    output.field("Database", &health.database);
    if health.testing_mode {
        output.field("Mode", "testing");
    }
    if let Some(ts) = health.timestamp.as_deref() {
        output.field("Checked", &format_timestamp(ts));
    }

    if !health.is_healthy() {
        bail!("Registry reports status '{}'", health.status);
    }
    Ok(())
}
