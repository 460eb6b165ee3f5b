use dirs::home_dir;
use std::path::{Path, PathBuf};

/// Returns the purr home directory, or None if the user's home cannot be resolved.
pub fn try_purr_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("PURR_HOME") {
        if !val.is_empty() {
            return Some(PathBuf::from(val));
        }
    }
    home_dir().map(|h| h.join(".purr"))
}

/// Returns the canonical purr home directory (`~/.purr`).
///
/// Falls back to `./.purr` when neither `PURR_HOME` is set nor the user's home
/// directory can be resolved.
pub fn purr_home() -> PathBuf {
    try_purr_home().unwrap_or_else(|| PathBuf::from(".purr"))
}

/// Installed packages root: ~/.purr/packages
pub fn packages_path() -> PathBuf {
    purr_home().join("packages")
}

/// Settings file: ~/.purr/settings.toml
pub fn settings_path() -> PathBuf {
    purr_home().join("settings.toml")
}

/// Directory of a single package under `root`.
pub fn package_dir(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}
