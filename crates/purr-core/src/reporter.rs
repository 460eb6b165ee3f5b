//! Reporter trait for dependency injection
//!
//! Core logic reports progress through this trait and never writes to the
//! console itself. The CLI renders events to the terminal; tests record them.

use std::fmt;

use purr_schema::PackageName;

/// Pipeline stage a status event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Installing,
    Updating,
    Upgrading,
    Downgrading,
    Uninstalling,
    Resolving,
    Dependency,
    Cloning,
    Fetching,
    Switching,
    Running,
    Recording,
    Removing,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Installing => "Installing",
            Self::Updating => "Updating",
            Self::Upgrading => "Upgrading",
            Self::Downgrading => "Downgrading",
            Self::Uninstalling => "Uninstalling",
            Self::Resolving => "Resolving",
            Self::Dependency => "Dependency",
            Self::Cloning => "Cloning",
            Self::Fetching => "Fetching",
            Self::Switching => "Switched",
            Self::Running => "Running",
            Self::Recording => "Recording",
            Self::Removing => "Removing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub trait Reporter: Send + Sync {
    /// A pipeline stage started for `target` (a package spec, URL, or script).
    fn stage(&self, stage: Stage, target: &str);

    /// Marks a package operation as successfully completed.
    fn done(&self, name: &PackageName, version: &str, detail: &str);

    /// An install step for `target` (a package name or the spec as typed)
    /// failed with the fatal error `reason`.
    fn failed(&self, target: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn stage(&self, stage: Stage, target: &str) {
        (**self).stage(stage, target);
    }
    fn done(&self, name: &PackageName, version: &str, detail: &str) {
        (**self).done(name, version, detail);
    }
    fn failed(&self, target: &str, reason: &str) {
        (**self).failed(target, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
}

/// A no-op reporter for silent operations (e.g., scripting, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn stage(&self, _: Stage, _: &str) {}
    fn done(&self, _: &PackageName, _: &str, _: &str) {}
    fn failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}
