//! # Group reconciliation
//!
//! Converges a directory's groups onto a declared desired state.
//!
//! ## Overview
//!
//! - [`DesiredStateStore`]: validated desired groups, unique by email
//! - [`SettingsPolicy`]: baseline settings overlaid with per-group overrides
//! - planners for existence, settings, memberships and orphans, each a pure
//!   function from desired and observed state to [`Mutation`]s
//! - [`ReconciliationEngine`]: fetches observed state, runs the planners in
//!   order and applies or reports the result
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use groupsync_directory::InMemoryDirectory;
//! use groupsync_reconcile::{
//!     DesiredGroup, DesiredStateStore, ReconciliationContext, ReconciliationEngine,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let desired = DesiredStateStore::load(vec![DesiredGroup::new("team@example.com")])?;
//! let engine = ReconciliationEngine::new(
//!     Arc::new(InMemoryDirectory::new()),
//!     ReconciliationContext::new(desired, false),
//! );
//!
//! let report = engine.run().await?;
//! print!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod desired;
pub mod engine;
pub mod error;
pub mod existence;
pub mod export;
pub mod membership;
pub mod orphans;
pub mod plan;
pub mod report;
pub mod settings;

pub use desired::{
    DesiredGroup, DesiredStateStore, GroupsDocument, MAX_DESCRIPTION_CHARS, RECONCILE_MEMBERS_KEY,
};
pub use engine::{ReconciliationContext, ReconciliationEngine};
pub use error::{ReconcileError, ReconcileResult, ValidationError};
pub use existence::plan_existence;
pub use export::export_directory;
pub use membership::{plan_removals, plan_role, RemovalPolicy};
pub use orphans::plan_orphans;
pub use plan::{Mutation, MutationKind};
pub use report::{PlannedMutation, RunReport, RunStatistics};
pub use settings::{SettingChange, SettingsPolicy, BASELINE, OVERRIDABLE};
