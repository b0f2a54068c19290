//! Common test utilities for groupsync-reconcile integration tests.

#![allow(dead_code)]

use groupsync_directory::{Group, InMemoryDirectory, Role, SettingsMap};
use groupsync_reconcile::{
    DesiredGroup, DesiredStateStore, ReconciliationContext, ReconciliationEngine, SettingsPolicy,
};
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub const TEAM: &str = "team@example.com";
pub const OPS: &str = "ops@example.com";

pub fn baseline() -> SettingsMap {
    SettingsPolicy::default().baseline().clone()
}

/// Settings a freshly created group gets from the directory.
pub fn directory_defaults() -> SettingsMap {
    let mut settings = baseline();
    settings.insert(
        groupsync_directory::SettingName::WhoCanJoin,
        "CAN_REQUEST_TO_JOIN".to_string(),
    );
    settings.insert(
        groupsync_directory::SettingName::WhoCanViewMembership,
        "ALL_IN_DOMAIN_CAN_VIEW".to_string(),
    );
    settings
}

pub fn team() -> DesiredGroup {
    DesiredGroup::new(TEAM)
        .with_name("Team")
        .with_description("The team")
        .with_role(Role::Owner, ["boss@example.com"])
        .with_role(Role::Manager, ["mgr@example.com"])
        .with_role(Role::Member, ["a@example.com", "b@example.com"])
}

/// A directory already holding exactly [`team`].
pub fn converged_directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_default_settings(baseline())
        .with_group(
            Group::new(TEAM)
                .with_name("Team")
                .with_description("The team"),
        )
        .with_member(TEAM, "boss@example.com", Role::Owner)
        .with_member(TEAM, "mgr@example.com", Role::Manager)
        .with_member(TEAM, "a@example.com", Role::Member)
        .with_member(TEAM, "b@example.com", Role::Member)
}

/// A directory where [`team`] drifted in every dimension, plus an orphan.
pub fn drifted_directory() -> InMemoryDirectory {
    let mut settings = baseline();
    settings.insert(
        groupsync_directory::SettingName::WhoCanPostMessage,
        "ANYONE_CAN_POST".to_string(),
    );

    InMemoryDirectory::new()
        .with_default_settings(directory_defaults())
        .with_group(Group::new(TEAM).with_name("Old team name"))
        .with_settings(TEAM, settings)
        .with_member(TEAM, "boss@example.com", Role::Member)
        .with_member(TEAM, "a@example.com", Role::Member)
        .with_member(TEAM, "intruder@example.com", Role::Owner)
        .with_member(TEAM, "self-joined@example.com", Role::Member)
        .with_group(Group::new("legacy@example.com"))
}

pub fn engine(
    directory: &Arc<InMemoryDirectory>,
    groups: Vec<DesiredGroup>,
    confirm: bool,
) -> ReconciliationEngine<InMemoryDirectory> {
    let desired = DesiredStateStore::load(groups).unwrap();
    ReconciliationEngine::new(
        Arc::clone(directory),
        ReconciliationContext::new(desired, confirm),
    )
}
