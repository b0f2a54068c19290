//! The directory capability consumed by reconciliation.

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::types::{Group, Member, Role, SettingsMap};

/// Group, membership and settings operations against a directory service.
///
/// Every lookup addressed at a group that does not exist must fail with
/// [`DirectoryError::NotFound`](crate::DirectoryError::NotFound); callers rely
/// on that to tell "not created yet" apart from real failures. Bounding call
/// latency is the implementation's job.
#[async_trait]
pub trait DirectoryPort: Send + Sync {
    /// Fetches one group by email.
    async fn get_group(&self, email_id: &str) -> DirectoryResult<Group>;

    /// Creates a group. Empty `name`/`description` are left unset.
    async fn create_group(&self, group: &Group) -> DirectoryResult<Group>;

    /// Updates a group's name and description. Empty fields are not written.
    async fn update_group(&self, email_id: &str, group: &Group) -> DirectoryResult<Group>;

    /// Deletes a group.
    async fn delete_group(&self, email_id: &str) -> DirectoryResult<()>;

    /// Lists every group, ordered by email, following pages transparently.
    async fn list_groups(&self) -> DirectoryResult<Vec<Group>>;

    /// Lists a group's memberships.
    async fn list_members(&self, email_id: &str) -> DirectoryResult<Vec<Member>>;

    /// Adds `email` to the group with `role`.
    async fn insert_member(&self, email_id: &str, email: &str, role: Role) -> DirectoryResult<()>;

    /// Changes the role of an existing membership.
    async fn update_member_role(
        &self,
        email_id: &str,
        member_id: &str,
        role: Role,
    ) -> DirectoryResult<()>;

    /// Removes a membership.
    async fn delete_member(&self, email_id: &str, member_id: &str) -> DirectoryResult<()>;

    /// Reads a group's behavioral settings.
    async fn get_settings(&self, email_id: &str) -> DirectoryResult<SettingsMap>;

    /// Writes the given settings, leaving unspecified ones untouched.
    async fn patch_settings(&self, email_id: &str, settings: &SettingsMap) -> DirectoryResult<()>;
}
