//! Export of observed directory state as desired-state records.

use groupsync_directory::{DirectoryPort, Role};
use tracing::debug;

use crate::desired::{DesiredGroup, GroupsDocument};
use crate::error::{ReconcileError, ReconcileResult};
use crate::settings::SettingsPolicy;

/// Reads every group with its members and settings.
///
/// The result serializes to a `groups.yaml` document that, fed back in,
/// reconciles to no changes for the exported fields. Only overridable
/// settings are exported; baseline-only ones stay with the policy.
///
/// # Errors
///
/// Any directory failure aborts the export.
pub async fn export_directory<D>(directory: &D) -> ReconcileResult<GroupsDocument>
where
    D: DirectoryPort + ?Sized,
{
    let groups = directory
        .list_groups()
        .await
        .map_err(|e| ReconcileError::directory("list_groups", "*", e))?;

    let mut exported = Vec::with_capacity(groups.len());
    for group in groups {
        let email_id = group.email.clone();
        debug!(email_id = %email_id, "Exporting group");

        let members = directory
            .list_members(&email_id)
            .await
            .map_err(|e| ReconcileError::directory("list_members", &email_id, e))?;
        let settings = directory
            .get_settings(&email_id)
            .await
            .map_err(|e| ReconcileError::directory("get_settings", &email_id, e))?;

        let mut record = DesiredGroup::new(email_id)
            .with_name(group.name)
            .with_description(group.description);
        for role in Role::ALL {
            record = record.with_role(
                role,
                members
                    .iter()
                    .filter(|m| m.role == role)
                    .map(|m| m.email.clone()),
            );
        }
        record.settings = settings
            .into_iter()
            .filter(|(name, _)| SettingsPolicy::is_overridable(*name))
            .map(|(name, value)| (name.key().to_string(), value))
            .collect();

        exported.push(record);
    }

    Ok(GroupsDocument { groups: exported })
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupsync_directory::{Group, InMemoryDirectory, SettingName, SettingsMap};

    #[tokio::test]
    async fn test_export_buckets_members_by_role() {
        let mut settings = SettingsMap::new();
        settings.insert(SettingName::WhoCanJoin, "INVITED_CAN_JOIN".to_string());
        settings.insert(
            SettingName::WhoCanModerateContent,
            "OWNERS_AND_MANAGERS".to_string(),
        );
        let directory = InMemoryDirectory::new()
            .with_default_settings(settings)
            .with_group(Group::new("team@example.com").with_name("Team"))
            .with_member("team@example.com", "boss@example.com", Role::Owner)
            .with_member("team@example.com", "a@example.com", Role::Member)
            .with_member("team@example.com", "b@example.com", Role::Member);

        let doc = export_directory(&directory).await.unwrap();

        assert_eq!(doc.groups.len(), 1);
        let group = &doc.groups[0];
        assert_eq!(group.name, "Team");
        assert_eq!(group.owners, vec!["boss@example.com"]);
        assert!(group.managers.is_empty());
        assert_eq!(group.members, vec!["a@example.com", "b@example.com"]);
        assert_eq!(group.settings["WhoCanJoin"], "INVITED_CAN_JOIN");
        assert!(!group.settings.contains_key("WhoCanModerateContent"));
        assert!(SettingsPolicy::ignored_keys(&group.settings).is_empty());
    }

    #[tokio::test]
    async fn test_export_of_empty_directory() {
        let doc = export_directory(&InMemoryDirectory::new()).await.unwrap();
        assert!(doc.groups.is_empty());
    }
}
