use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

use crate::spec::SpecError;

/// A validated package name.
///
/// Names double as directory names under the packages root, so anything that
/// could escape that directory is rejected. Case is preserved because the
/// registry matches names verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    /// Validate and wrap a package name.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError::EmptyName`] for an empty (or all-whitespace) name and
    /// [`SpecError::InvalidName`] for names containing path separators or equal
    /// to `.` / `..`.
    pub fn new(name: &str) -> Result<Self, SpecError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SpecError::EmptyName);
        }
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(SpecError::InvalidName(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// Return the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PackageName {
    type Error = SpecError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl TryFrom<&str> for PackageName {
    type Error = SpecError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<PackageName> for String {
    fn from(name: PackageName) -> Self {
        name.0
    }
}

impl AsRef<std::path::Path> for PackageName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq<str> for PackageName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Borrow<str> for PackageName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_preserves_case() {
        let name = PackageName::new("PurrTools").unwrap();
        assert_eq!(name.as_str(), "PurrTools");
    }

    #[test]
    fn test_name_rejects_traversal() {
        assert!(matches!(PackageName::new(""), Err(SpecError::EmptyName)));
        assert!(matches!(PackageName::new(".."), Err(SpecError::InvalidName(_))));
        assert!(matches!(
            PackageName::new("a/b"),
            Err(SpecError::InvalidName(_))
        ));
        assert!(matches!(
            PackageName::new("a\\b"),
            Err(SpecError::InvalidName(_))
        ));
    }

    #[test]
    fn test_name_deserialize_validates() {
        let ok: PackageName = serde_json::from_str("\"cat-tools\"").unwrap();
        assert_eq!(ok, "cat-tools");
        assert!(serde_json::from_str::<PackageName>("\"../etc\"").is_err());
    }
}
