//! Repository materialization.
//!
//! Brings a package's source tree to the requested ref:
//!
//! - **Absent** (no `.git`): `git clone`, then best-effort `git checkout <version>`.
//! - **Present**: `git fetch --all --tags`, then `git checkout <version>`,
//!   falling back to `origin/<version>`, then `git pull` (ignored on failure,
//!   e.g. detached HEAD on a tag).
//!
//! Only the first step (clone or fetch) is fatal. Version pinning is
//! best-effort: a missing ref leaves the tree on whatever is checked out.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::process::{Captured, ProcessError, run_captured};
use crate::reporter::{Reporter, Stage};

/// Version string meaning "whatever the default branch is".
pub const LATEST: &str = "latest";

#[derive(Error, Debug)]
pub enum RepoError {
    #[error("failed to clone {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: ProcessError,
    },

    #[error("failed to fetch updates in {}: {source}", path.display())]
    Fetch {
        path: PathBuf,
        #[source]
        source: ProcessError,
    },

    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// On-disk state of a package directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Absent,
    Present,
}

impl RepoState {
    pub fn of(target: &Path) -> Self {
        if target.join(".git").is_dir() {
            Self::Present
        } else {
            Self::Absent
        }
    }
}

/// Which ref ended up checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checkout {
    /// No version requested (or `latest`): default branch / current HEAD.
    Default,
    /// `git checkout <version>` succeeded.
    Requested(String),
    /// `git checkout origin/<version>` succeeded.
    RemoteBranch(String),
    /// Neither ref exists; the tree stayed where it was.
    PinFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    /// State the directory was in before materializing.
    pub previous: RepoState,
    pub checkout: Checkout,
}

#[async_trait]
pub trait Materialize: Send + Sync {
    /// Bring `target` to `version` of `git_url`.
    async fn materialize(
        &self,
        target: &Path,
        git_url: &str,
        version: Option<&str>,
        reporter: &dyn Reporter,
    ) -> Result<Materialized, RepoError>;
}

/// [`Materialize`] over the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct GitMaterializer {
    timeout: Option<Duration>,
}

impl GitMaterializer {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    async fn git<I, S>(&self, args: I, cwd: Option<&Path>) -> Result<Captured, ProcessError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        // Never block on a credential prompt.
        run_captured("git", args, &[("GIT_TERMINAL_PROMPT", "0")], cwd, self.timeout).await
    }

    async fn checkout(&self, target: &Path, reference: &str) -> Result<(), ProcessError> {
        self.git(["checkout", "--quiet", reference], Some(target))
            .await
            .map(|_| ())
    }

    async fn clone_fresh(
        &self,
        target: &Path,
        git_url: &str,
        version: Option<&str>,
        reporter: &dyn Reporter,
    ) -> Result<Checkout, RepoError> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|source| RepoError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        reporter.stage(Stage::Cloning, git_url);
        let target_arg = target.as_os_str();
        self.git(
            [
                std::ffi::OsStr::new("clone"),
                std::ffi::OsStr::new("--quiet"),
                std::ffi::OsStr::new(git_url),
                target_arg,
            ],
            None,
        )
        .await
        .map_err(|source| RepoError::Clone {
            url: git_url.to_string(),
            source,
        })?;

        let Some(version) = version else {
            return Ok(Checkout::Default);
        };
        match self.checkout(target, version).await {
            Ok(()) => {
                reporter.stage(Stage::Switching, &format!("to version {version}"));
                Ok(Checkout::Requested(version.to_string()))
            }
            Err(e) => {
                warn!(version, error = %e, "checkout after clone failed");
                reporter.warning(&format!(
                    "Could not find version {version}, using default branch"
                ));
                Ok(Checkout::PinFailed(version.to_string()))
            }
        }
    }

    async fn update_existing(
        &self,
        target: &Path,
        version: Option<&str>,
        reporter: &dyn Reporter,
    ) -> Result<Checkout, RepoError> {
        reporter.stage(Stage::Fetching, &target.display().to_string());
        self.git(["fetch", "--all", "--tags", "--quiet"], Some(target))
            .await
            .map_err(|source| RepoError::Fetch {
                path: target.to_path_buf(),
                source,
            })?;

        let checkout = match version {
            None => Checkout::Default,
            Some(version) => {
                if self.checkout(target, version).await.is_ok() {
                    reporter.stage(Stage::Switching, &format!("to version {version}"));
                    Checkout::Requested(version.to_string())
                } else if self
                    .checkout(target, &format!("origin/{version}"))
                    .await
                    .is_ok()
                {
                    reporter.stage(
                        Stage::Switching,
                        &format!("to remote branch origin/{version}"),
                    );
                    Checkout::RemoteBranch(version.to_string())
                } else {
                    reporter.warning(&format!(
                        "Could not find version {version}, staying on current branch"
                    ));
                    Checkout::PinFailed(version.to_string())
                }
            }
        };

        if let Err(e) = self.git(["pull", "--quiet"], Some(target)).await {
            debug!(path = %target.display(), error = %e, "pull skipped");
        }

        Ok(checkout)
    }
}

#[async_trait]
impl Materialize for GitMaterializer {
    async fn materialize(
        &self,
        target: &Path,
        git_url: &str,
        version: Option<&str>,
        reporter: &dyn Reporter,
    ) -> Result<Materialized, RepoError> {
        let version = version.filter(|v| !v.is_empty() && *v != LATEST);
        let previous = RepoState::of(target);
        let checkout = match previous {
            RepoState::Absent => self.clone_fresh(target, git_url, version, reporter).await?,
            RepoState::Present => self.update_existing(target, version, reporter).await?,
        };
        Ok(Materialized { previous, checkout })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::NullReporter;
    use std::process::Command;

    fn have_git() -> bool {
        which::which("git").is_ok()
    }

    fn git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .args([
                "-c",
                "user.name=purr",
                "-c",
                "user.email=purr@example.com",
                "-c",
                "commit.gpgsign=false",
                "-c",
                "tag.gpgsign=false",
            ])
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(status.status.success(), "git {args:?} failed: {status:?}");
    }

    /// An origin repository with two commits and a `v1.0` tag on the first.
    fn origin(root: &Path) -> PathBuf {
        let origin = root.join("origin");
        std::fs::create_dir_all(&origin).unwrap();
        git(&origin, &["init", "--quiet"]);
        std::fs::write(origin.join("install.sh"), "echo one\n").unwrap();
        git(&origin, &["add", "."]);
        git(&origin, &["commit", "--quiet", "-m", "one"]);
        git(&origin, &["tag", "v1.0"]);
        std::fs::write(origin.join("install.sh"), "echo two\n").unwrap();
        git(&origin, &["commit", "--quiet", "-am", "two"]);
        origin
    }

    fn head_contents(target: &Path) -> String {
        std::fs::read_to_string(target.join("install.sh")).unwrap()
    }

    #[test]
    fn test_state_detection() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(RepoState::of(dir.path()), RepoState::Absent);
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert_eq!(RepoState::of(dir.path()), RepoState::Present);
    }

    #[tokio::test]
    async fn test_clone_absent_creates_git_dir() {
        if !have_git() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let origin = origin(dir.path());
        let target = dir.path().join("packages").join("catnip");

        let result = GitMaterializer::default()
            .materialize(&target, origin.to_str().unwrap(), None, &NullReporter)
            .await
            .unwrap();

        assert!(target.join(".git").is_dir());
        assert_eq!(result.previous, RepoState::Absent);
        assert_eq!(result.checkout, Checkout::Default);
        assert_eq!(head_contents(&target), "echo two\n");
    }

    #[tokio::test]
    async fn test_clone_then_pin_tag() {
        if !have_git() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let origin = origin(dir.path());
        let target = dir.path().join("catnip");

        let result = GitMaterializer::default()
            .materialize(&target, origin.to_str().unwrap(), Some("v1.0"), &NullReporter)
            .await
            .unwrap();

        assert_eq!(result.checkout, Checkout::Requested("v1.0".into()));
        assert_eq!(head_contents(&target), "echo one\n");
    }

    #[tokio::test]
    async fn test_second_materialize_is_idempotent() {
        if !have_git() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let origin = origin(dir.path());
        let target = dir.path().join("catnip");
        let materializer = GitMaterializer::default();

        materializer
            .materialize(&target, origin.to_str().unwrap(), Some("v1.0"), &NullReporter)
            .await
            .unwrap();
        let again = materializer
            .materialize(&target, origin.to_str().unwrap(), Some("v1.0"), &NullReporter)
            .await
            .unwrap();

        assert_eq!(again.previous, RepoState::Present);
        assert_eq!(again.checkout, Checkout::Requested("v1.0".into()));
        assert_eq!(head_contents(&target), "echo one\n");
    }

    #[tokio::test]
    async fn test_unknown_version_is_not_fatal() {
        if !have_git() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let origin = origin(dir.path());
        let target = dir.path().join("catnip");
        let materializer = GitMaterializer::default();

        let fresh = materializer
            .materialize(&target, origin.to_str().unwrap(), Some("v9.9"), &NullReporter)
            .await
            .unwrap();
        assert_eq!(fresh.checkout, Checkout::PinFailed("v9.9".into()));

        let updated = materializer
            .materialize(&target, origin.to_str().unwrap(), Some("v9.9"), &NullReporter)
            .await
            .unwrap();
        assert_eq!(updated.checkout, Checkout::PinFailed("v9.9".into()));
        assert_eq!(head_contents(&target), "echo two\n");
    }

    #[tokio::test]
    async fn test_update_falls_back_to_remote_branch() {
        if !have_git() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let origin = origin(dir.path());
        let target = dir.path().join("catnip");
        let materializer = GitMaterializer::default();

        materializer
            .materialize(&target, origin.to_str().unwrap(), None, &NullReporter)
            .await
            .unwrap();

        // A branch that only exists upstream. With guessing off, a bare
        // `checkout feature` cannot create a tracking branch for it.
        git(&origin, &["checkout", "--quiet", "-b", "feature"]);
        std::fs::write(origin.join("install.sh"), "echo three\n").unwrap();
        git(&origin, &["commit", "--quiet", "-am", "three"]);
        git(&target, &["config", "checkout.guess", "false"]);

        let updated = materializer
            .materialize(&target, origin.to_str().unwrap(), Some("feature"), &NullReporter)
            .await
            .unwrap();

        assert_eq!(updated.previous, RepoState::Present);
        assert_eq!(updated.checkout, Checkout::RemoteBranch("feature".into()));
        assert_eq!(head_contents(&target), "echo three\n");
    }

    #[tokio::test]
    async fn test_latest_skips_checkout() {
        if !have_git() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let origin = origin(dir.path());
        let target = dir.path().join("catnip");

        let result = GitMaterializer::default()
            .materialize(&target, origin.to_str().unwrap(), Some(LATEST), &NullReporter)
            .await
            .unwrap();
        assert_eq!(result.checkout, Checkout::Default);
    }

    #[tokio::test]
    async fn test_clone_failure_is_fatal() {
        if !have_git() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("catnip");

        let err = GitMaterializer::default()
            .materialize(
                &target,
                dir.path().join("no-such-origin").to_str().unwrap(),
                None,
                &NullReporter,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RepoError::Clone { .. }));
        assert!(!target.join(".git").exists());
    }
}
