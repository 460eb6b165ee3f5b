use std::path::PathBuf;
use std::time::Duration;

use purr_schema::{MetadataError, SpecError};
use thiserror::Error;

use crate::registry::RegistryError;
use crate::repo::RepoError;

/// Fatal failures of an install, uninstall, or alias operation.
///
/// The first one raised anywhere in the dependency tree aborts the whole
/// top-level operation.
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("package {name}{} not found", version_suffix(version.as_deref()))]
    NotFound {
        name: String,
        version: Option<String>,
    },

    #[error("registry error: {0}")]
    Registry(#[source] RegistryError),

    #[error("repository error for {name}: {source}")]
    Repository {
        name: String,
        #[source]
        source: RepoError,
    },

    #[error("installer {} failed: {reason}", script.display())]
    InstallerExecution { script: PathBuf, reason: String },

    #[error("installer {} timed out after {}s", script.display(), after.as_secs())]
    InstallerTimeout { script: PathBuf, after: Duration },

    #[error("cyclic dependency: {}", chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },

    #[error(transparent)]
    InvalidSpec(#[from] SpecError),

    #[error("invalid metadata: {0}")]
    InvalidMetadata(#[from] MetadataError),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write record {}: {source}", path.display())]
    Record {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl InstallError {
    /// Short category used by the CLI when printing the failure.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not found",
            Self::Registry(_) => "registry",
            Self::Repository { .. } => "repository",
            Self::InstallerExecution { .. } | Self::InstallerTimeout { .. } => "installer",
            Self::CyclicDependency { .. } => "dependency",
            Self::InvalidSpec(_) | Self::InvalidMetadata(_) => "invalid input",
            Self::Io { .. } | Self::Record { .. } => "filesystem",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn version_suffix(version: Option<&str>) -> String {
    version.map(|v| format!("@{v}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = InstallError::NotFound {
            name: "catnip".into(),
            version: Some("1.0".into()),
        };
        assert_eq!(err.to_string(), "package catnip@1.0 not found");
        assert_eq!(err.category(), "not found");

        let err = InstallError::CyclicDependency {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cyclic dependency: a -> b -> a");
    }
}
