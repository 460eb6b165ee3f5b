//! Command modules - one file per CLI command

pub mod health;
pub mod info;
pub mod install;
pub mod list;
pub mod search;
pub mod stats;
pub mod uninstall;
