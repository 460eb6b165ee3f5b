//! purr - Finite User Repository package manager CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use purr_cli::{Cli, Commands, Context, cmd};
use purr_core::{ListQuery, Operation};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::load(cli.registries)?;

    match cli.command {
        Commands::Install { package } => cmd::install::install(&ctx, Operation::Install, &package).await,
        Commands::Update { package } => cmd::install::install(&ctx, Operation::Update, &package).await,
        Commands::Upgrade { package } => cmd::install::install(&ctx, Operation::Upgrade, &package).await,
        Commands::Downgrade { package } => {
            cmd::install::install(&ctx, Operation::Downgrade, &package).await
        }
        Commands::Uninstall { package } => cmd::uninstall::uninstall(&ctx, &package).await,
        Commands::Search { query } => cmd::search::search(&ctx, &query).await,
        Commands::List { installed: true, .. } => cmd::list::list_installed(&ctx),
        Commands::List {
            sort,
            page,
            page_size,
            ..
        } => {
            cmd::list::list(
                &ctx,
                &ListQuery {
                    sort,
                    page,
                    page_size,
                },
            )
            .await
        }
        Commands::Info {
            package,
            pkg_version,
        } => cmd::info::info(&ctx, &package, pkg_version.as_deref()).await,
        Commands::Stats => cmd::stats::stats(&ctx).await,
        Commands::Health => cmd::health::health(&ctx).await,
    }
}
