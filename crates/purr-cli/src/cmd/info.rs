//! Info command

use anyhow::{Result, bail};
use purr_core::install::read_record;
use purr_core::{Registry, RegistryError, package_dir, packages_path};
use purr_schema::PackageName;

use crate::Context;

/// Show registry metadata for a package, plus its local install state.
pub async fn info(ctx: &Context, package: &str, version: Option<&str>) -> Result<()> {
    let output = &ctx.output;
    let name = PackageName::new(package)?;
    output.step("Getting", &format!("info for {name}"));

    let metadata = match ctx.registry.fetch_metadata(&name, version).await {
        Ok(metadata) => metadata,
        Err(RegistryError::NotFound(what)) => bail!("Package '{what}' not found"),
        Err(e) => return Err(e.into()),
    };

    output.section("Package Information");
    println!("  {}", output.package(&metadata.name, &metadata.version));
    output.field("Description", &metadata.description);
    output.field("Authors", &metadata.authors.join(", "));
    output.field("Homepage", &metadata.homepage);
    output.field("Issue Tracker", &metadata.issue_tracker);
    output.field("Git", &metadata.git);
    output.field("Installer", &metadata.installer);
    output.field("Dependencies", &metadata.dependencies.join(", "));

    let dir = package_dir(&packages_path(), name.as_str());
    let status = match read_record(&dir) {
        Ok(record) => format!(
            "Installed ({})",
            record.version().unwrap_or("latest")
        ),
        Err(_) if dir.exists() => "Incomplete install".to_string(),
        Err(_) => "Not installed".to_string(),
    };
    output.field("Status", &status);
    Ok(())
}
