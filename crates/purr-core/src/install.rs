//! Install orchestration.
//!
//! [`Installer::install`] resolves a spec, installs its declared dependencies
//! depth-first in declaration order, then materializes the package, runs its
//! installer script, writes the `furconfig.json` record and reports the
//! download.
//!
//! The dependency walk is an explicit worklist of enter/finish frames rather
//! than recursion. An ancestry chain turns dependency cycles into
//! [`InstallError::CyclicDependency`] before anything in the cycle is cloned,
//! and a set of completed specs makes diamond dependencies install once per
//! invocation. Distinct versions of the same name still install in visit
//! order, so the last one wins.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use purr_schema::{PackageMetadata, PackageName, PackageSpec};
use tracing::{debug, warn};

use crate::error::InstallError;
use crate::paths::package_dir;
use crate::process::{ProcessError, run_streaming};
use crate::registry::{Registry, RegistryError};
use crate::repo::{Checkout, Materialize, RepoState};
use crate::reporter::{Reporter, Stage};
use crate::script;

/// Which command drove an install. Only the reported label differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Update,
    Upgrade,
    Downgrade,
}

impl Operation {
    pub fn stage(self) -> Stage {
        match self {
            Self::Install => Stage::Installing,
            Self::Update => Stage::Updating,
            Self::Upgrade => Stage::Upgrading,
            Self::Downgrade => Stage::Downgrading,
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Self::Install => "installed",
            Self::Update => "updated",
            Self::Upgrade => "upgraded",
            Self::Downgrade => "downgraded",
        }
    }
}

/// One package written to disk during an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    pub name: PackageName,
    /// Version the tree was pinned to, if any.
    pub version: Option<String>,
    pub path: PathBuf,
    pub checkout: Checkout,
}

/// A directory found under the packages root.
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub name: String,
    pub path: PathBuf,
    /// `None` when the directory has no readable record (e.g. a failed install).
    pub record: Option<PackageMetadata>,
}

enum Frame {
    Enter(PackageSpec),
    Finish(PackageSpec, Box<PackageMetadata>),
}

/// Runs install, uninstall and the install aliases against one packages root.
pub struct Installer {
    registry: Arc<dyn Registry>,
    materializer: Arc<dyn Materialize>,
    reporter: Arc<dyn Reporter>,
    packages_dir: PathBuf,
    installer_timeout: Option<Duration>,
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("packages_dir", &self.packages_dir)
            .field("installer_timeout", &self.installer_timeout)
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// A relative `packages_dir` is anchored at the current directory, since
    /// scripts run with their package directory as the working directory.
    pub fn new(
        registry: Arc<dyn Registry>,
        materializer: Arc<dyn Materialize>,
        reporter: Arc<dyn Reporter>,
        packages_dir: PathBuf,
    ) -> Self {
        let packages_dir = std::path::absolute(&packages_dir).unwrap_or(packages_dir);
        Self {
            registry,
            materializer,
            reporter,
            packages_dir,
            installer_timeout: None,
        }
    }

    /// Limit how long installer and uninstaller scripts may run.
    pub fn with_installer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.installer_timeout = timeout;
        self
    }

    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    pub async fn install(&self, spec: &str) -> Result<Vec<Installed>, InstallError> {
        self.run(Operation::Install, spec).await
    }

    pub async fn update(&self, spec: &str) -> Result<Vec<Installed>, InstallError> {
        self.run(Operation::Update, spec).await
    }

    pub async fn upgrade(&self, spec: &str) -> Result<Vec<Installed>, InstallError> {
        self.run(Operation::Upgrade, spec).await
    }

    pub async fn downgrade(&self, spec: &str) -> Result<Vec<Installed>, InstallError> {
        self.run(Operation::Downgrade, spec).await
    }

    /// Install `spec` and its dependency tree, reporting under `op`'s label.
    ///
    /// Returns every package written, dependencies first.
    pub async fn run(&self, op: Operation, spec: &str) -> Result<Vec<Installed>, InstallError> {
        let root = PackageSpec::parse(spec).map_err(|e| self.failure(spec, e.into()))?;
        let mut stack = vec![Frame::Enter(root)];
        let mut ancestry: Vec<PackageName> = Vec::new();
        let mut completed: HashSet<PackageSpec> = HashSet::new();
        let mut installed = Vec::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(spec) => {
                    if completed.contains(&spec) {
                        debug!(package = %spec, "already installed in this run");
                        continue;
                    }
                    if ancestry.contains(&spec.name) {
                        let mut chain: Vec<String> =
                            ancestry.iter().map(ToString::to_string).collect();
                        chain.push(spec.name.to_string());
                        return Err(self.failure(
                            spec.name.as_str(),
                            InstallError::CyclicDependency { chain },
                        ));
                    }

                    let stage = if ancestry.is_empty() {
                        op.stage()
                    } else {
                        Stage::Dependency
                    };
                    self.reporter.stage(stage, &spec.to_string());

                    let metadata = self.reported(&spec.name, self.fetch(&spec).await)?;
                    let dependencies = metadata
                        .dependencies
                        .iter()
                        .map(|d| PackageSpec::parse(d))
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| self.failure(spec.name.as_str(), e.into()))?;
                    if !dependencies.is_empty() {
                        self.reporter.stage(
                            Stage::Resolving,
                            &format!("{} dependencies of {}", dependencies.len(), spec.name),
                        );
                    }

                    ancestry.push(spec.name.clone());
                    stack.push(Frame::Finish(spec, Box::new(metadata)));
                    stack.extend(dependencies.into_iter().rev().map(Frame::Enter));
                }
                Frame::Finish(spec, metadata) => {
                    let done =
                        self.reported(&spec.name, self.finish(op, &spec, &metadata).await)?;
                    ancestry.pop();
                    completed.insert(spec);
                    installed.push(done);
                }
            }
        }

        Ok(installed)
    }

    /// Surface a per-package failure before it aborts the operation.
    fn reported<T>(
        &self,
        name: &PackageName,
        result: Result<T, InstallError>,
    ) -> Result<T, InstallError> {
        result.map_err(|e| self.failure(name.as_str(), e))
    }

    fn failure(&self, target: &str, error: InstallError) -> InstallError {
        self.reporter.failed(target, &error.to_string());
        error
    }

    async fn fetch(&self, spec: &PackageSpec) -> Result<PackageMetadata, InstallError> {
        let metadata = self
            .registry
            .fetch_metadata(&spec.name, spec.version())
            .await
            .map_err(|e| match e {
                RegistryError::NotFound(_) => InstallError::NotFound {
                    name: spec.name.to_string(),
                    version: spec.version.clone(),
                },
                other => InstallError::Registry(other),
            })?;
        metadata.validate()?;
        Ok(metadata)
    }

    /// Materialize, run the installer, record and report one package whose
    /// dependencies are already in place.
    async fn finish(
        &self,
        op: Operation,
        spec: &PackageSpec,
        metadata: &PackageMetadata,
    ) -> Result<Installed, InstallError> {
        let dir = package_dir(&self.packages_dir, spec.name.as_str());
        let version = metadata.version().or(spec.version());

        let materialized = self
            .materializer
            .materialize(&dir, &metadata.git, version, self.reporter.as_ref())
            .await
            .map_err(|source| InstallError::Repository {
                name: spec.name.to_string(),
                source,
            })?;

        if let Some(installer) = metadata.installer() {
            let script = dir.join(installer);
            if script.is_file() {
                self.run_script(&script, &dir).await?;
            } else {
                warn!(script = %script.display(), "installer missing");
                self.reporter
                    .warning(&format!("Installer script not found: {installer}"));
            }
        }

        self.write_record(&dir, metadata)?;
        self.registry.report_download(&spec.name).await;

        let detail = match materialized.previous {
            RepoState::Absent => op.past_tense(),
            RepoState::Present => "updated",
        };
        self.reporter
            .done(&spec.name, version.unwrap_or("latest"), detail);

        Ok(Installed {
            name: spec.name.clone(),
            version: version.map(str::to_string),
            path: dir,
            checkout: materialized.checkout,
        })
    }

    /// Resolve and run `script` with `cwd` as its working directory.
    async fn run_script(&self, script: &Path, cwd: &Path) -> Result<(), InstallError> {
        let invocation =
            script::resolve(script).map_err(|e| InstallError::InstallerExecution {
                script: script.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.reporter.stage(Stage::Running, &invocation.to_string());

        run_streaming(&invocation, cwd, self.installer_timeout)
            .await
            .map_err(|e| match e {
                ProcessError::TimedOut { after, .. } => InstallError::InstallerTimeout {
                    script: script.to_path_buf(),
                    after,
                },
                other => InstallError::InstallerExecution {
                    script: script.to_path_buf(),
                    reason: other.to_string(),
                },
            })
    }

    fn write_record(&self, dir: &Path, metadata: &PackageMetadata) -> Result<(), InstallError> {
        let path = dir.join(PackageMetadata::RECORD_FILE);
        self.reporter
            .stage(Stage::Recording, PackageMetadata::RECORD_FILE);
        let json = serde_json::to_string_pretty(metadata).map_err(|source| {
            InstallError::Record {
                path: path.clone(),
                source,
            }
        })?;
        std::fs::write(&path, json).map_err(|e| InstallError::io(&path, e))
    }

    /// Remove an installed package, running its uninstall script first when
    /// one exists.
    ///
    /// Returns `false` when the package was not installed.
    pub async fn uninstall(&self, name: &str) -> Result<bool, InstallError> {
        let name = PackageName::new(name)?;
        let dir = package_dir(&self.packages_dir, name.as_str());
        if !dir.exists() {
            self.reporter
                .warning(&format!("Package {name} is not installed"));
            return Ok(false);
        }

        self.reporter.stage(Stage::Uninstalling, name.as_str());

        let mut version = String::from("-");
        match read_record(&dir) {
            Ok(record) => {
                if let Some(v) = record.version() {
                    version = v.to_string();
                }
                if let Some(uninstaller) = record.installer().and_then(uninstall_script_for) {
                    let script = dir.join(&uninstaller);
                    if script.is_file() {
                        if let Err(e) = self.run_script(&script, &dir).await {
                            self.reporter
                                .warning(&format!("Uninstall script failed: {e}"));
                        }
                    } else {
                        debug!(script = %script.display(), "no uninstall script");
                    }
                }
            }
            Err(e) => {
                self.reporter
                    .warning(&format!("Could not read package record: {e}"));
            }
        }

        self.reporter
            .stage(Stage::Removing, &dir.display().to_string());
        std::fs::remove_dir_all(&dir).map_err(|e| InstallError::io(&dir, e))?;
        self.reporter.done(&name, &version, "uninstalled");
        Ok(true)
    }

    /// Every directory under the packages root, sorted by name.
    pub fn installed(&self) -> Result<Vec<InstalledPackage>, InstallError> {
        let entries = match std::fs::read_dir(&self.packages_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(InstallError::io(&self.packages_dir, e)),
        };

        let mut packages = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| InstallError::io(&self.packages_dir, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            packages.push(InstalledPackage {
                name: entry.file_name().to_string_lossy().into_owned(),
                record: read_record(&path).ok(),
                path,
            });
        }
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(packages)
    }
}

/// Read `furconfig.json` from a package directory.
pub fn read_record(dir: &Path) -> Result<PackageMetadata, InstallError> {
    let path = dir.join(PackageMetadata::RECORD_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| InstallError::io(&path, e))?;
    serde_json::from_str(&content).map_err(|source| InstallError::Record { path, source })
}

/// `scripts/install.sh` -> `scripts/uninstall.sh`.
///
/// Only the file name is rewritten. `None` when the name does not mention
/// `install`, since the result would be the installer itself.
pub fn uninstall_script_for(installer: &str) -> Option<PathBuf> {
    let path = Path::new(installer);
    let file_name = path.file_name()?.to_str()?;
    if !file_name.contains("install") {
        return None;
    }
    Some(path.with_file_name(file_name.replace("install", "uninstall")))
}
