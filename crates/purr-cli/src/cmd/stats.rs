//! Stats command

use anyhow::{Context as _, Result};
use crossterm::style::Stylize;
use purr_core::Stage;
use purr_schema::format_timestamp;

use crate::Context;
use crate::ui::table;

pub async fn stats(ctx: &Context) -> Result<()> {
    let output = &ctx.output;
    output.step(Stage::Fetching.label(), "repository statistics");

    let stats = ctx
        .registry
        .statistics()
        .await
        .context("Could not retrieve statistics")?;

    output.section("Repository Statistics");
    println!("{}", table::overview(&stats));

    if !stats.popular_authors.is_empty() {
        output.field("Popular Authors", &stats.popular_authors.join(", "));
    }

    if !stats.most_downloaded.is_empty() {
        println!();
        println!("{}", "Most Downloaded".with(output.theme().colors.warning));
        println!("{}", table::most_downloaded(&stats.most_downloaded));
    }

    if !stats.recently_added.is_empty() {
        println!();
        println!("{}", "Recently Added".with(output.theme().colors.success));
        println!("{}", table::recently_added(&stats.recently_added));
    }

    if let Some(updated) = stats.last_updated.as_deref() {
        println!();
        output.dim(&format!("Last Updated: {}", format_timestamp(updated)));
    }
    Ok(())
}
