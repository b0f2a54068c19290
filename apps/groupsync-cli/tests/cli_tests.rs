//! End-to-end tests for config loading, discovery and runs against an
//! in-memory directory.

use groupsync_cli::commands::run::{load_store, reconcile, render_report};
use groupsync_cli::config::load_config;
use groupsync_directory::{Group, InMemoryDirectory, Role};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const TEAM_YAML: &str = r#"
groups:
  - email-id: team@example.com
    name: Team
    description: The team
    settings:
      ReconcileMembers: true
    owners:
      - boss@example.com
    members:
      - a@example.com
"#;

const OPS_YAML: &str = r#"
groups:
  - email-id: ops@example.com
    name: Ops
    managers:
      - oncall@example.com
"#;

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "config.yaml",
        "bot-id: groupsync@example.iam.gserviceaccount.com\n",
    );
    write(tmp.path(), "sig-team/groups.yaml", TEAM_YAML);
    write(tmp.path(), "sig-ops/groups.yaml", OPS_YAML);
    tmp
}

fn drifted_directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_group(Group::new("team@example.com").with_name("Team"))
        .with_member("team@example.com", "boss@example.com", Role::Member)
        .with_member("team@example.com", "stale@example.com", Role::Member)
        .with_group(Group::new("legacy@example.com"))
}

#[test]
fn test_config_directory_is_the_default_groups_path() {
    let tmp = workspace();
    let config_path = tmp.path().join("config.yaml");

    let config = load_config(&config_path).unwrap();
    let store = load_store(&config.groups_dir(&config_path)).unwrap();

    assert_eq!(store.len(), 2);
    assert!(store.contains("team@example.com"));
    assert!(store.contains("ops@example.com"));
}

#[test]
fn test_missing_config_exits_with_config_code() {
    let tmp = TempDir::new().unwrap();
    let err = load_config(&tmp.path().join("config.yaml")).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_group_declared_in_two_files_is_rejected() {
    let tmp = workspace();
    write(tmp.path(), "copy/groups.yaml", OPS_YAML);

    let err = load_store(tmp.path()).unwrap_err();

    assert_eq!(err.exit_code(), 4);
    assert!(err.to_string().contains("ops@example.com"));
}

#[tokio::test]
async fn test_dry_run_reports_without_touching_the_directory() {
    let tmp = workspace();
    let directory = Arc::new(drifted_directory());

    let report = reconcile(directory.clone(), load_store(tmp.path()).unwrap(), false)
        .await
        .unwrap();

    assert!(!report.confirm);
    assert!(!report.is_converged());
    assert_eq!(report.applied_count(), 0);
    assert!(directory.mutation_calls().await.is_empty());

    let text = render_report(&report, false).unwrap();
    assert!(text.contains("(dry-run)"));
    assert!(text.contains("[planned]"));
}

#[tokio::test]
async fn test_confirmed_run_converges() {
    let tmp = workspace();
    let directory = Arc::new(drifted_directory());

    let report = reconcile(directory.clone(), load_store(tmp.path()).unwrap(), true)
        .await
        .unwrap();
    assert_eq!(report.applied_count(), report.mutations.len());

    assert_eq!(
        directory.group_emails().await,
        vec!["ops@example.com", "team@example.com"]
    );
    let team: Vec<(String, Role)> = directory
        .members_of("team@example.com")
        .await
        .into_iter()
        .map(|m| (m.email, m.role))
        .collect();
    assert!(team.contains(&("boss@example.com".to_string(), Role::Owner)));
    assert!(team.contains(&("a@example.com".to_string(), Role::Member)));
    assert_eq!(team.len(), 2);

    let second = reconcile(directory, load_store(tmp.path()).unwrap(), true)
        .await
        .unwrap();
    assert!(second.is_converged(), "second run planned: {second}");
}

#[tokio::test]
async fn test_json_report_is_machine_readable() {
    let tmp = workspace();
    let directory = Arc::new(drifted_directory());

    let report = reconcile(directory, load_store(tmp.path()).unwrap(), false)
        .await
        .unwrap();
    let rendered = render_report(&report, true).unwrap();

    let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(value["confirm"], false);
    let kinds: Vec<&str> = value["mutations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"create_group"));
    assert!(kinds.contains(&"delete_group"));
}
