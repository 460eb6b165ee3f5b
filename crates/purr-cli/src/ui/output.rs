//! The handle commands print through.
//!
//! Progress goes to stdout as a right-aligned stage label followed by its
//! target, cargo style. Warnings and errors go to stderr so listings stay
//! pipeable.

use crossterm::style::Stylize;
use purr_core::{Reporter, Stage};
use purr_schema::PackageName;

use super::theme::{STAGE_WIDTH, Theme};

#[derive(Debug, Clone, Default)]
pub struct Output {
    theme: Theme,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// `    Fetching package list`
    pub fn step(&self, label: &str, target: &str) {
        let label = format!("{label:>width$}", width = STAGE_WIDTH);
        println!("{} {target}", label.with(self.theme.colors.stage).bold());
    }

    /// A bold heading preceded by a blank line.
    pub fn section(&self, title: &str) {
        println!();
        println!("{}", title.bold());
    }

    /// `name@version` in package colors; version omitted when empty.
    pub fn package(&self, name: &str, version: &str) -> String {
        let name = name.with(self.theme.colors.package_name).bold();
        if version.is_empty() {
            name.to_string()
        } else {
            let version = format!("@{version}");
            format!("{name}{}", version.with(self.theme.colors.version))
        }
    }

    /// `  • text`
    pub fn bullet(&self, text: &str) {
        println!("  {} {text}", self.theme.icons.bullet.with(self.theme.colors.secondary));
    }

    /// `   Label: value`, skipped when `value` is empty.
    pub fn field(&self, label: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        println!(
            "   {} {value}",
            format!("{label}:").with(self.theme.colors.secondary)
        );
    }

    pub fn dim(&self, text: &str) {
        println!("{}", text.with(self.theme.colors.secondary));
    }

    pub fn info(&self, msg: &str) {
        println!("{} {msg}", self.theme.icons.info.with(self.theme.colors.secondary));
    }

    pub fn success(&self, msg: &str) {
        println!(
            "{} {}",
            self.theme.icons.success.with(self.theme.colors.success),
            msg.with(self.theme.colors.success)
        );
    }

    pub fn warning(&self, msg: &str) {
        eprintln!(
            "{} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        );
    }

    pub fn error(&self, msg: &str) {
        eprintln!(
            "{} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            msg.with(self.theme.colors.error)
        );
    }
}

impl Reporter for Output {
    fn stage(&self, stage: Stage, target: &str) {
        self.step(stage.label(), target);
    }

    fn done(&self, name: &PackageName, version: &str, detail: &str) {
        self.success(&format!("{name} {version} {detail}"));
    }

    fn failed(&self, target: &str, reason: &str) {
        Output::error(self, &format!("{target} failed: {reason}"));
    }

    fn info(&self, msg: &str) {
        Output::info(self, msg);
    }

    fn success(&self, msg: &str) {
        Output::success(self, msg);
    }

    fn warning(&self, msg: &str) {
        Output::warning(self, msg);
    }

    fn error(&self, msg: &str) {
        Output::error(self, msg);
    }
}
