//! Package specifier parsing.
//!
//! Supports:
//! - Registry default: `catnip`
//! - Pinned: `catnip@1.2.0`, `catnip@main`, `catnip@latest`
//!
//! Only the first `@` separates name from version, so `catnip@feature@2`
//! pins the ref `feature@2`.

use thiserror::Error;

use crate::types::PackageName;

/// Errors produced while parsing a package specifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// The name part is empty (`@1.0` or an empty token).
    #[error("Invalid package specifier: missing package name")]
    EmptyName,

    /// The spec ends with `@` but carries no version.
    #[error("Invalid package specifier '{0}': missing version after @")]
    EmptyVersion(String),

    /// The name cannot be used as a directory name.
    #[error("Invalid package name '{0}'")]
    InvalidName(String),
}

/// Parsed package specifier with optional version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageSpec {
    /// Package name.
    pub name: PackageName,
    /// Requested version, tag, or branch. `None` means "whatever the registry serves".
    pub version: Option<String>,
}

impl PackageSpec {
    /// Parse a package specifier like `catnip` or `catnip@1.2.0`.
    ///
    /// # Errors
    ///
    /// Returns a [`SpecError`] if the name is missing or invalid, or if the
    /// version after `@` is empty.
    pub fn parse(spec: &str) -> Result<Self, SpecError> {
        let spec = spec.trim();
        match spec.split_once('@') {
            Some((name, version)) => {
                let name = PackageName::new(name)?;
                if version.is_empty() {
                    return Err(SpecError::EmptyVersion(spec.to_string()));
                }
                Ok(Self {
                    name,
                    version: Some(version.to_string()),
                })
            }
            None => Ok(Self {
                name: PackageName::new(spec)?,
                version: None,
            }),
        }
    }

    /// Build a spec from already-separated parts.
    pub fn new(name: PackageName, version: Option<String>) -> Self {
        Self { name, version }
    }

    /// Get version string for display
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Check if this specifier requests a specific version
    pub fn is_pinned(&self) -> bool {
        self.version.is_some()
    }
}

impl std::str::FromStr for PackageSpec {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{v}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
