//! Search command

use anyhow::{Context as _, Result};
use purr_core::Stage;

use crate::Context;

/// Search the registry, printing full entries when the registry sends them.
pub async fn search(ctx: &Context, query: &str) -> Result<()> {
    let output = &ctx.output;
    output.step(Stage::Fetching.label(), &format!("packages matching '{query}'"));

    let results = ctx
        .registry
        .search(query)
        .await
        .context("Search failed")?;

    if results.is_empty() {
        output.warning("No packages found");
        return Ok(());
    }

    output.section(&format!("Found {} packages", results.package_count));
    if results.detailed_packages.is_empty() {
        for name in &results.packages {
            output.bullet(&output.package(name, ""));
        }
        return Ok(());
    }

    for pkg in &results.detailed_packages {
        println!();
        println!("  {}", output.package(&pkg.name, &pkg.version));
        output.field("Description", &pkg.description);
        output.field("Authors", &pkg.authors.join(", "));
        output.field("Dependencies", &pkg.dependencies.join(", "));
        output.field("Homepage", &pkg.homepage);
    }
    Ok(())
}
