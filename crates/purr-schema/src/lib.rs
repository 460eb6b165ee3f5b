//! Shared types and wire format for purr.
//!
//! Everything here is plain data: what the registry serves, what the installer
//! persists, and how users name packages on the command line.

/// Registry payloads and the installed package record.
pub mod metadata;
/// `name[@version]` specifiers.
pub mod spec;
/// Validated identifiers.
pub mod types;

// Re-exports
pub use metadata::*;
pub use spec::{PackageSpec, SpecError};
pub use types::PackageName;

/// Default public registry.
pub const DEFAULT_REGISTRY: &str = "http://purr.finite.ovh";
