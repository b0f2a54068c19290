//! groupsync command line
//!
//! Loads `config.yaml`, collects every `groups.yaml` below the groups path
//! and reconciles them into Google Workspace.

pub mod commands;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;

pub use error::{CliError, CliResult};
