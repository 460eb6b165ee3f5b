use serde::{Deserialize, Serialize};

/// Package metadata as served by the registry.
///
/// The same structure is persisted verbatim as `furconfig.json` inside each
/// installed package directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Package name (e.g. "catnip")
    #[serde(default)]
    pub name: String,

    /// Version, tag, or branch the registry resolved
    #[serde(default)]
    pub version: String,

    /// One-line description
    #[serde(default)]
    pub description: String,

    /// Authors in display order
    #[serde(default)]
    pub authors: Vec<String>,

    /// Project homepage
    #[serde(default)]
    pub homepage: String,

    /// Issue tracker URL
    #[serde(default)]
    pub issue_tracker: String,

    /// Source repository URL (required)
    #[serde(default)]
    pub git: String,

    /// Installer script path, relative to the repository root. Empty means none.
    #[serde(default)]
    pub installer: String,

    /// Dependency specifiers (`name` or `name@version`), installed in order
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Errors that can occur when validating [`PackageMetadata`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// The `git` field is empty.
    #[error("package '{0}' has no git repository URL")]
    MissingGit(String),
}

impl PackageMetadata {
    /// File name of the installed-package record.
    pub const RECORD_FILE: &'static str = "furconfig.json";

    /// Checks the fields the installer relies on.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::MissingGit`] if `git` is empty.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.git.trim().is_empty() {
            return Err(MetadataError::MissingGit(self.name.clone()));
        }
        Ok(())
    }

    /// The declared installer script, if any.
    pub fn installer(&self) -> Option<&str> {
        let trimmed = self.installer.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// The resolved version, if the registry reported one.
    pub fn version(&self) -> Option<&str> {
        let trimmed = self.version.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Condensed package entry returned by `search` when details are requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    /// Package name
    #[serde(default)]
    pub name: String,
    /// Latest version
    #[serde(default)]
    pub version: String,
    /// One-line description
    #[serde(default)]
    pub description: String,
    /// Authors in display order
    #[serde(default)]
    pub authors: Vec<String>,
    /// Dependency specifiers
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Project homepage
    #[serde(default)]
    pub homepage: String,
}

/// Response body of the package list and search endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageList {
    /// Total number of matching packages
    #[serde(default)]
    pub package_count: u64,
    /// Matching package names
    #[serde(default)]
    pub packages: Vec<String>,
    /// Full entries, present when `details=true` was requested
    #[serde(default)]
    pub detailed_packages: Vec<PackageSummary>,
}

impl PackageList {
    /// True when the response carries neither names nor detailed entries.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty() && self.detailed_packages.is_empty()
    }
}

/// Per-package counters used in statistics listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageStats {
    /// Package name
    #[serde(default)]
    pub name: String,
    /// Latest version
    #[serde(default)]
    pub version: String,
    /// Download counter
    #[serde(default)]
    pub downloads: u64,
    /// When the package was first published (registry-formatted timestamp)
    #[serde(default)]
    pub added_date: Option<String>,
}

/// Aggregate registry statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStatistics {
    /// Number of packages ever published
    #[serde(default)]
    pub total_packages: u64,
    /// Number of packages currently listed
    #[serde(default)]
    pub active_packages: u64,
    /// Sum of all download counters
    #[serde(default)]
    pub total_downloads: u64,
    /// Sum of all page views
    #[serde(default)]
    pub total_views: u64,
    /// Most prolific authors
    #[serde(default)]
    pub popular_authors: Vec<String>,
    /// Packages ordered by downloads, descending
    #[serde(default)]
    pub most_downloaded: Vec<PackageStats>,
    /// Packages ordered by publication date, newest first
    #[serde(default)]
    pub recently_added: Vec<PackageStats>,
    /// When the statistics were computed (registry-formatted timestamp)
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// Registry liveness report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// "healthy" or "unhealthy"
    #[serde(default)]
    pub status: String,
    /// Server time of the health check
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Registry software version
    #[serde(default)]
    pub version: String,
    /// Number of packages the registry holds
    #[serde(default)]
    pub package_count: u64,
    /// Whether the registry runs in testing mode
    #[serde(default)]
    pub testing_mode: bool,
    /// Storage backend name
    #[serde(default)]
    pub database: String,
}

impl HealthStatus {
    /// True when the registry reports itself healthy.
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Render a registry timestamp as `YYYY-MM-DD HH:MM`.
///
/// The registry emits both RFC 3339 timestamps and offset-less ones; anything
/// unparseable is returned unchanged.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_defaults_missing_fields() {
        let meta: PackageMetadata =
            serde_json::from_str(r#"{"name":"catnip","git":"https://x/catnip.git"}"#).unwrap();
        assert_eq!(meta.name, "catnip");
        assert!(meta.dependencies.is_empty());
        assert_eq!(meta.installer(), None);
        assert!(meta.validate().is_ok());
    }

    #[test]
    fn test_metadata_uses_snake_case_issue_tracker() {
        let meta: PackageMetadata = serde_json::from_str(
            r#"{"name":"catnip","issue_tracker":"https://x/issues","git":"g"}"#,
        )
        .unwrap();
        assert_eq!(meta.issue_tracker, "https://x/issues");
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"issue_tracker\""));
    }

    #[test]
    fn test_metadata_requires_git() {
        let meta = PackageMetadata {
            name: "catnip".into(),
            git: "  ".into(),
            ..Default::default()
        };
        assert_eq!(
            meta.validate(),
            Err(MetadataError::MissingGit("catnip".into()))
        );
    }

    #[test]
    fn test_statistics_camel_case() {
        let stats: RepositoryStatistics = serde_json::from_str(
            r#"{
                "totalPackages": 12,
                "activePackages": 10,
                "totalDownloads": 3400,
                "mostDownloaded": [{"name": "catnip", "downloads": 900}],
                "lastUpdated": "2025-07-24T04:08:24.5"
            }"#,
        )
        .unwrap();
        assert_eq!(stats.total_packages, 12);
        assert_eq!(stats.most_downloaded[0].downloads, 900);
        assert!(stats.recently_added.is_empty());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2025-07-24T04:08:24Z"), "2025-07-24 04:08");
        assert_eq!(
            format_timestamp("2025-07-24T04:08:24.1234567"),
            "2025-07-24 04:08"
        );
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
