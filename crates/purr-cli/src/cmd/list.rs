//! List command

use anyhow::{Context as _, Result};
use purr_core::{ListQuery, Stage};

use crate::Context;
use crate::ui::table;

/// List one page of registry packages.
pub async fn list(ctx: &Context, query: &ListQuery) -> Result<()> {
    let output = &ctx.output;
    output.step(Stage::Fetching.label(), "package list");

    let results = ctx
        .registry
        .list(query)
        .await
        .context("Failed to list packages")?;

    if results.is_empty() {
        output.warning("No packages available");
        return Ok(());
    }

    output.section(&format!(
        "Available packages ({} total)",
        results.package_count
    ));
    if results.detailed_packages.is_empty() {
        for name in &results.packages {
            output.bullet(&output.package(name, ""));
        }
    } else {
        println!("{}", table::summaries(&results.detailed_packages));
    }

    let shown = results.packages.len().max(results.detailed_packages.len()) as u64;
    if results.package_count > shown {
        output.dim(&format!(
            "Page {} ({} per page). Use --page to see more.",
            query.page, query.page_size
        ));
    }
    Ok(())
}

/// List packages under the local packages root.
pub fn list_installed(ctx: &Context) -> Result<()> {
    let installer = ctx.installer();
    let packages = installer
        .installed()
        .context("Failed to read installed packages")?;

    if packages.is_empty() {
        ctx.output.info("No packages installed.");
        ctx.output.dim("Run 'purr install <package>' to get started.");
        return Ok(());
    }

    println!("{}", table::installed(&packages));
    ctx.output.dim(&format!("{} packages total", packages.len()));
    Ok(())
}
