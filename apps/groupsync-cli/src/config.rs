//! Run configuration (`config.yaml`).

use groupsync_directory::client::{
    DEFAULT_ADMIN_ENDPOINT, DEFAULT_CUSTOMER, DEFAULT_SETTINGS_ENDPOINT, MAX_PAGE_SIZE,
};
use groupsync_directory::{RetryConfig, WorkspaceConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CliError, CliResult};

/// Retry knobs for directory calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl RetrySettings {
    #[must_use]
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            ..RetryConfig::default()
        }
    }
}

fn default_customer() -> String {
    DEFAULT_CUSTOMER.to_string()
}

fn default_admin_endpoint() -> String {
    DEFAULT_ADMIN_ENDPOINT.to_string()
}

fn default_settings_endpoint() -> String {
    DEFAULT_SETTINGS_ENDPOINT.to_string()
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

/// Contents of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfig {
    /// Service account the run acts as.
    pub bot_id: String,
    /// Secret holding the service account key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_version: Option<String>,
    /// Absolute directory searched for `groups.yaml` files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_path: Option<PathBuf>,
    #[serde(default = "default_customer")]
    pub customer: String,
    #[serde(default = "default_admin_endpoint")]
    pub admin_endpoint: String,
    #[serde(default = "default_settings_endpoint")]
    pub settings_endpoint: String,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Load a run configuration from a YAML file.
pub fn load_config(path: &Path) -> CliResult<RunConfig> {
    if !path.exists() {
        return Err(CliError::Config(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("Failed to read file {}: {}", path.display(), e)))?;

    let config: RunConfig = serde_yaml::from_str(&content).map_err(|e| {
        let location = if let Some(loc) = e.location() {
            format!(" at line {}, column {}", loc.line(), loc.column())
        } else {
            String::new()
        };
        CliError::Config(format!("Invalid YAML in {}{location}: {e}", path.display()))
    })?;

    config.validate()?;
    Ok(config)
}

impl RunConfig {
    /// Check required fields and value ranges.
    pub fn validate(&self) -> CliResult<()> {
        if self.bot_id.trim().is_empty() {
            return Err(CliError::Config("bot-id must not be empty".to_string()));
        }

        if let Some(ref path) = self.groups_path {
            if !path.is_absolute() {
                return Err(CliError::Config(format!(
                    "groups-path must be an absolute path, got {}",
                    path.display()
                )));
            }
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(CliError::Config(format!(
                "page-size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(CliError::Config(
                "retry.initial-delay-ms must not exceed retry.max-delay-ms".to_string(),
            ));
        }

        Ok(())
    }

    /// Directory holding `groups.yaml` files: `groups-path`, or the
    /// directory of the config file.
    pub fn groups_dir(&self, config_path: &Path) -> PathBuf {
        match self.groups_path {
            Some(ref path) => path.clone(),
            None => match config_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }

    #[must_use]
    pub fn workspace_config(&self) -> WorkspaceConfig {
        WorkspaceConfig {
            admin_endpoint: self.admin_endpoint.clone(),
            settings_endpoint: self.settings_endpoint.clone(),
            customer: self.customer.clone(),
            page_size: self.page_size,
            ..WorkspaceConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> RunConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = parse("bot-id: bot@example.iam.gserviceaccount.com\n");
        assert!(config.validate().is_ok());
        assert_eq!(config.customer, "my_customer");
        assert_eq!(config.page_size, 200);
        assert_eq!(config.retry, RetrySettings::default());
        assert!(config.groups_path.is_none());
        assert_eq!(config.admin_endpoint, DEFAULT_ADMIN_ENDPOINT);
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
bot-id: bot@example.iam.gserviceaccount.com
secret-version: projects/p/secrets/groups-key/versions/latest
groups-path: /srv/groups
customer: C01234
retry:
  max-retries: 5
  initial-delay-ms: 100
page-size: 50
"#,
        );
        assert!(config.validate().is_ok());
        assert_eq!(config.groups_path, Some(PathBuf::from("/srv/groups")));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.max_delay_ms, 30_000);

        let retry = config.retry.to_retry_config();
        assert_eq!(retry.initial_delay, Duration::from_millis(100));
        assert_eq!(config.workspace_config().customer, "C01234");
    }

    #[test]
    fn test_relative_groups_path_is_rejected() {
        let config = parse("bot-id: bot\ngroups-path: groups\n");
        assert!(matches!(config.validate(), Err(CliError::Config(_))));
    }

    #[test]
    fn test_groups_dir_defaults_to_config_directory() {
        let config = parse("bot-id: bot\n");
        assert_eq!(
            config.groups_dir(Path::new("/etc/groupsync/config.yaml")),
            PathBuf::from("/etc/groupsync")
        );
        assert_eq!(config.groups_dir(Path::new("config.yaml")), PathBuf::from("."));
    }

    #[test]
    fn test_out_of_range_page_size_is_rejected() {
        let config = parse("bot-id: bot\npage-size: 1000\n");
        assert!(config.validate().is_err());
    }
}
