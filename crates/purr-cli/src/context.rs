//! Shared command context.
//!
//! Groups the settings, registry client and terminal output every command
//! needs, so handlers take one argument instead of four.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use purr_core::{GitMaterializer, Installer, RegistryClient, Settings, packages_path, settings_path};
use tracing::debug;

use crate::ui::Output;

#[derive(Debug, Clone)]
pub struct Context {
    pub settings: Settings,
    pub registry: Arc<RegistryClient>,
    pub output: Output,
}

impl Context {
    /// Load `settings.toml` and apply `--registry` overrides.
    pub fn load(registries: Vec<String>) -> Result<Self> {
        let path = settings_path();
        let settings = Settings::load(&path)
            .context("Failed to load settings")?
            .with_repositories(registries);
        debug!(registries = ?settings.repositories, "settings loaded");

        let registry = RegistryClient::new(settings.repositories.clone(), settings.request_timeout())
            .context("Failed to create registry client")?;

        Ok(Self {
            settings,
            registry: Arc::new(registry),
            output: Output::new(),
        })
    }

    /// An installer over `~/.purr/packages` reporting to the terminal.
    pub fn installer(&self) -> Installer {
        Installer::new(
            self.registry.clone(),
            Arc::new(GitMaterializer::new(self.settings.git_timeout())),
            Arc::new(self.output.clone()),
            packages_path(),
        )
        .with_installer_timeout(self.settings.installer_timeout())
    }
}
