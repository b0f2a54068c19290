//! Directory access for groupsync
//!
//! This crate defines the [`DirectoryPort`] capability that reconciliation
//! drives, and the adapters implementing it:
//!
//! - [`WorkspaceClient`]: Google Workspace Admin SDK + Groups Settings API
//! - [`RetryingDirectory`]: exponential backoff around any port
//! - [`InMemoryDirectory`]: process-local directory with a call log
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use groupsync_directory::{
//!     DirectoryPort, RetryConfig, RetryingDirectory, StaticToken, WorkspaceClient,
//!     WorkspaceConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = Arc::new(StaticToken::from_env("GROUPSYNC_ACCESS_TOKEN")?);
//! let client = WorkspaceClient::new(WorkspaceConfig::default(), tokens)?;
//! let directory = RetryingDirectory::new(client, RetryConfig::default());
//!
//! for group in directory.list_groups().await? {
//!     println!("{}", group.email);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod memory;
pub mod port;
pub mod retry;
pub mod types;

pub use auth::{AccessTokenSource, StaticToken};
pub use client::{WorkspaceClient, WorkspaceConfig};
pub use error::{DirectoryError, DirectoryResult};
pub use memory::{InMemoryDirectory, Operation, RecordedCall};
pub use port::DirectoryPort;
pub use retry::{RetryConfig, RetryingDirectory};
pub use types::{Group, Member, Role, SettingName, SettingsMap};
