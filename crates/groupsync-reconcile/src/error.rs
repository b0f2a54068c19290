//! Error types for reconciliation.

use groupsync_directory::{DirectoryError, Role};
use thiserror::Error;

/// Result type alias using `ReconcileError`.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Desired state that cannot be reconciled as written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Group record {record} has no email-id")]
    MissingIdentity { record: String },

    #[error("Group {email_id} is declared more than once")]
    DuplicateIdentity { email_id: String },

    #[error("Description of group {email_id} is {length} characters long (max 300)")]
    DescriptionTooLong { email_id: String, length: usize },

    #[error("Member {member} is listed twice in group {email_id}")]
    DuplicateMember { email_id: String, member: String },

    #[error("Member {member} of group {email_id} is listed as both {first} and {second}")]
    ConflictingRoles {
        email_id: String,
        member: String,
        first: Role,
        second: Role,
    },
}

/// Errors that abort a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Invalid desired state: {0}")]
    Validation(#[from] ValidationError),

    #[error("{operation} failed for {email_id}: {source}")]
    Directory {
        operation: &'static str,
        email_id: String,
        #[source]
        source: DirectoryError,
    },
}

impl ReconcileError {
    pub fn directory(
        operation: &'static str,
        email_id: impl Into<String>,
        source: DirectoryError,
    ) -> Self {
        Self::Directory {
            operation,
            email_id: email_id.into(),
            source,
        }
    }

    /// The underlying directory failure, if the run died on one.
    #[must_use]
    pub fn directory_error(&self) -> Option<&DirectoryError> {
        match self {
            Self::Directory { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}
