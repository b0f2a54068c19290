//! Recursive discovery of `groups.yaml` files.

use groupsync_reconcile::{DesiredGroup, GroupsDocument};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CliError, CliResult};

/// File name holding desired groups.
pub const GROUPS_FILE: &str = "groups.yaml";

/// Every `groups.yaml` below `root`, in walk order sorted by file name.
pub fn find_group_files(root: &Path) -> CliResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CliError::Config(format!(
            "groups path {} is not a directory",
            root.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == GROUPS_FILE {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Parses one `groups.yaml`.
pub fn read_groups_file(path: &Path) -> CliResult<Vec<DesiredGroup>> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("Failed to read file {}: {}", path.display(), e)))?;

    let document: GroupsDocument = serde_yaml::from_str(&content).map_err(|e| {
        let location = if let Some(loc) = e.location() {
            format!(" at line {}, column {}", loc.line(), loc.column())
        } else {
            String::new()
        };
        CliError::Validation(format!("Invalid YAML in {}{location}: {e}", path.display()))
    })?;

    Ok(document.groups)
}

/// Concatenates the groups of every `groups.yaml` below `root`.
pub fn load_desired_groups(root: &Path) -> CliResult<Vec<DesiredGroup>> {
    let mut groups = Vec::new();
    for path in find_group_files(root)? {
        let found = read_groups_file(&path)?;
        debug!(path = %path.display(), groups = found.len(), "Loaded groups file");
        groups.extend(found);
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_finds_nested_files_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "sig-b/groups.yaml", "groups: []\n");
        write(tmp.path(), "sig-a/nested/groups.yaml", "groups: []\n");
        write(tmp.path(), "sig-a/groups.yml", "groups: []\n");
        write(tmp.path(), "README.md", "# groups\n");

        let files = find_group_files(tmp.path()).unwrap();

        let relative: Vec<PathBuf> = files
            .iter()
            .map(|f| f.strip_prefix(tmp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("sig-a/nested/groups.yaml"),
                PathBuf::from("sig-b/groups.yaml"),
            ]
        );
    }

    #[test]
    fn test_merges_groups_across_files() {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "a/groups.yaml",
            "groups:\n  - email-id: a@example.com\n    members: [x@example.com]\n",
        );
        write(
            tmp.path(),
            "b/groups.yaml",
            "groups:\n  - email-id: b@example.com\n  - email-id: c@example.com\n",
        );

        let groups = load_desired_groups(tmp.path()).unwrap();

        let emails: Vec<&str> = groups.iter().map(|g| g.email_id.as_str()).collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.com", "c@example.com"]);
        assert_eq!(groups[0].members, vec!["x@example.com"]);
    }

    #[test]
    fn test_malformed_file_names_its_path() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "groups.yaml", "groups: [\n");

        let err = load_desired_groups(tmp.path()).unwrap_err();

        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("groups.yaml"));
    }

    #[test]
    fn test_missing_root_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        let err = find_group_files(&tmp.path().join("absent")).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
