//! CLI error types and exit codes

use groupsync_directory::DirectoryError;
use groupsync_reconcile::ReconcileError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: Configuration or I/O error
/// - 2: Authentication error
/// - 3: Network error
/// - 4: Validation error
/// - 5: Directory/server error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid desired state: {0}")]
    Validation(String),

    #[error("Directory error: {0}")]
    Directory(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::Io(_) => 1,
            CliError::Auth(_) => 2,
            CliError::Network(_) => 3,
            CliError::Validation(_) => 4,
            CliError::Directory(_) => 5,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {self}");
        } else {
            eprintln!("Error: {self}");
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {suggestion}");
            } else {
                eprintln!("\nSuggestion: {suggestion}");
            }
        }
    }

    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Auth(_) => Some(
                "Export a valid access token in GROUPSYNC_ACCESS_TOKEN for the account in bot-id.",
            ),
            CliError::Network(_) => Some("Check your network connection and try again."),
            _ => None,
        }
    }
}

impl From<DirectoryError> for CliError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::Auth(msg) => CliError::Auth(msg),
            DirectoryError::Config(msg) => CliError::Config(msg),
            DirectoryError::Url(inner) => CliError::Config(format!("invalid endpoint: {inner}")),
            other => {
                let message = other.to_string();
                match CliError::from_directory_ref(&other) {
                    Some(kind) => kind(message),
                    None => CliError::Directory(message),
                }
            }
        }
    }
}

impl From<ReconcileError> for CliError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Validation(v) => CliError::Validation(v.to_string()),
            ReconcileError::Directory { ref source, .. } => {
                let message = e.to_string();
                match CliError::from_directory_ref(source) {
                    Some(kind) => kind(message),
                    None => CliError::Directory(message),
                }
            }
        }
    }
}

impl CliError {
    /// Picks the variant for a directory failure without consuming it.
    fn from_directory_ref(e: &DirectoryError) -> Option<fn(String) -> CliError> {
        match e {
            DirectoryError::Auth(_) => Some(CliError::Auth),
            DirectoryError::Http(inner) if inner.is_connect() || inner.is_timeout() => {
                Some(CliError::Network)
            }
            DirectoryError::MaxRetriesExceeded { last, .. } => Self::from_directory_ref(last),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Config(format!("JSON error: {e}"))
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(e: serde_yaml::Error) -> Self {
        CliError::Config(format!("YAML error: {e}"))
    }
}

impl From<walkdir::Error> for CliError {
    fn from(e: walkdir::Error) -> Self {
        CliError::Io(e.to_string())
    }
}
