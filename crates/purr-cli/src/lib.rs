//! purr - package manager for the Finite User Repository
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Installs packages published to a purr registry. Each package is a git
//! repository plus an optional installer script; dependencies are installed
//! first, depth-first, in declaration order.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.purr/              # or $PURR_HOME
//! ├── settings.toml     # registries and timeouts
//! └── packages/
//!     └── <name>/       # git checkout
//!         └── furconfig.json
//! ```

pub mod cmd;
pub mod context;
pub mod ui;

pub use context::Context;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "purr")]
#[command(author, version, about = "purr - Finite User Repository package manager")]
pub struct Cli {
    /// Registry base URL; repeat or comma-separate for fallbacks
    #[arg(
        long = "registry",
        global = true,
        env = "PURR_REGISTRY",
        value_delimiter = ','
    )]
    pub registries: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install a package and its dependencies
    Install {
        /// Package name with optional version: pkg or pkg@1.0.0
        package: String,
    },
    /// Search the registry
    Search {
        /// Search query
        query: String,
    },
    /// List registry packages, or installed ones with --installed
    List {
        /// Sort key understood by the registry (e.g. mostDownloads, recentlyUpdated)
        #[arg(long)]
        sort: Option<String>,
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
        /// Entries per page
        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
        page_size: u32,
        /// Show locally installed packages instead of querying the registry
        #[arg(long, conflicts_with_all = ["sort", "page", "page_size"])]
        installed: bool,
    },
    /// Show package metadata
    Info {
        /// Package name
        package: String,
        /// Specific version
        #[arg(long = "version")]
        pkg_version: Option<String>,
    },
    /// Show registry statistics
    Stats,
    /// Re-install a package, fetching upstream changes
    Update {
        /// Package name with optional version
        package: String,
    },
    /// Upgrade a package to a specific version
    Upgrade {
        /// Package name with optional version
        package: String,
    },
    /// Downgrade a package to a specific version
    Downgrade {
        /// Package name with optional version
        package: String,
    },
    /// Uninstall a package
    Uninstall {
        /// Package name
        package: String,
    },
    /// Check registry health
    Health,
}
