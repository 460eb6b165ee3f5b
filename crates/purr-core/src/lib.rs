pub mod error;
pub mod install;
pub mod paths;
pub mod process;
pub mod registry;
pub mod repo;
pub mod reporter;
pub mod script;
pub mod settings;

pub use error::InstallError;
pub use install::{Installed, InstalledPackage, Installer, Operation};
pub use paths::*;
pub use registry::{ListQuery, Registry, RegistryClient, RegistryError};
pub use repo::{GitMaterializer, Materialize};
pub use reporter::{NullReporter, Reporter, Stage};
pub use settings::Settings;

/// User Agent string for registry requests
pub const USER_AGENT: &str = concat!("purr/", env!("CARGO_PKG_VERSION"));
