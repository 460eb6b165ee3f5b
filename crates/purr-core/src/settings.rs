//! User settings, read from `~/.purr/settings.toml`.
//!
//! ```toml
//! repositories = ["https://purr.finite.ovh", "https://mirror.example.org"]
//! request_timeout_secs = 30
//! installer_timeout_secs = 1800   # 0 disables the limit
//! git_timeout_secs = 600          # 0 disables the limit
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use purr_schema::DEFAULT_REGISTRY;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Registry base URLs, tried in order.
    pub repositories: Vec<String>,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Limit for a single installer or uninstaller script. 0 disables it.
    pub installer_timeout_secs: u64,
    /// Limit for a single git invocation. 0 disables it.
    pub git_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repositories: vec![DEFAULT_REGISTRY.to_string()],
            request_timeout_secs: 30,
            installer_timeout_secs: 30 * 60,
            git_timeout_secs: 10 * 60,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Replace the configured registries when `urls` is non-empty.
    pub fn with_repositories(mut self, urls: Vec<String>) -> Self {
        let urls: Vec<String> = urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if !urls.is_empty() {
            self.repositories = urls;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn installer_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.installer_timeout_secs)
    }

    pub fn git_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.git_timeout_secs)
    }
}

fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
