//! Planned directory mutations.

use groupsync_directory::{Group, Role, SettingsMap};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::settings::SettingChange;

/// Kind of a [`Mutation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    CreateGroup,
    UpdateGroup,
    InsertMember,
    UpdateMemberRole,
    DeleteMember,
    PatchSettings,
    DeleteGroup,
}

impl MutationKind {
    pub const ALL: [MutationKind; 7] = [
        MutationKind::CreateGroup,
        MutationKind::UpdateGroup,
        MutationKind::InsertMember,
        MutationKind::UpdateMemberRole,
        MutationKind::DeleteMember,
        MutationKind::PatchSettings,
        MutationKind::DeleteGroup,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::CreateGroup => "create_group",
            MutationKind::UpdateGroup => "update_group",
            MutationKind::InsertMember => "insert_member",
            MutationKind::UpdateMemberRole => "update_member_role",
            MutationKind::DeleteMember => "delete_member",
            MutationKind::PatchSettings => "patch_settings",
            MutationKind::DeleteGroup => "delete_group",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change to bring the directory closer to desired state.
///
/// Carries everything needed to apply it, or to describe it when the run
/// only reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mutation {
    CreateGroup {
        group: Group,
    },
    UpdateGroup {
        email_id: String,
        /// Fields to write; empty ones are left alone.
        group: Group,
        /// Observed state before the update.
        previous: Group,
    },
    InsertMember {
        email_id: String,
        email: String,
        role: Role,
    },
    UpdateMemberRole {
        email_id: String,
        member_id: String,
        email: String,
        from: Role,
        to: Role,
    },
    DeleteMember {
        email_id: String,
        member_id: String,
        email: String,
        role: Role,
    },
    PatchSettings {
        email_id: String,
        /// Full desired settings, as written.
        settings: SettingsMap,
        /// Settings that differ from the observed ones.
        changes: Vec<SettingChange>,
    },
    DeleteGroup {
        email_id: String,
    },
}

impl Mutation {
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::CreateGroup { .. } => MutationKind::CreateGroup,
            Mutation::UpdateGroup { .. } => MutationKind::UpdateGroup,
            Mutation::InsertMember { .. } => MutationKind::InsertMember,
            Mutation::UpdateMemberRole { .. } => MutationKind::UpdateMemberRole,
            Mutation::DeleteMember { .. } => MutationKind::DeleteMember,
            Mutation::PatchSettings { .. } => MutationKind::PatchSettings,
            Mutation::DeleteGroup { .. } => MutationKind::DeleteGroup,
        }
    }

    /// Group the mutation addresses.
    #[must_use]
    pub fn email_id(&self) -> &str {
        match self {
            Mutation::CreateGroup { group } => &group.email,
            Mutation::UpdateGroup { email_id, .. }
            | Mutation::InsertMember { email_id, .. }
            | Mutation::UpdateMemberRole { email_id, .. }
            | Mutation::DeleteMember { email_id, .. }
            | Mutation::PatchSettings { email_id, .. }
            | Mutation::DeleteGroup { email_id } => email_id,
        }
    }
}

fn describe_field(f: &mut fmt::Formatter<'_>, label: &str, have: &str, want: &str) -> fmt::Result {
    if !want.is_empty() && have != want {
        write!(f, " {label} {have:?} -> {want:?}")?;
    }
    Ok(())
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::CreateGroup { group } => {
                write!(f, "create group {}", group.email)?;
                if !group.name.is_empty() {
                    write!(f, " name {:?}", group.name)?;
                }
                if !group.description.is_empty() {
                    write!(f, " description {:?}", group.description)?;
                }
                Ok(())
            }
            Mutation::UpdateGroup {
                email_id,
                group,
                previous,
            } => {
                write!(f, "update group {email_id}:")?;
                describe_field(f, "name", &previous.name, &group.name)?;
                describe_field(f, "description", &previous.description, &group.description)
            }
            Mutation::InsertMember {
                email_id,
                email,
                role,
            } => write!(f, "add {email} to {email_id} as {role}"),
            Mutation::UpdateMemberRole {
                email_id,
                email,
                from,
                to,
                ..
            } => write!(f, "change role of {email} in {email_id} from {from} to {to}"),
            Mutation::DeleteMember {
                email_id,
                email,
                role,
                ..
            } => write!(f, "remove {role} {email} from {email_id}"),
            Mutation::PatchSettings {
                email_id, changes, ..
            } => {
                write!(f, "update settings of {email_id}:")?;
                for (i, change) in changes.iter().enumerate() {
                    let sep = if i == 0 { " " } else { ", " };
                    write!(f, "{sep}{change}")?;
                }
                Ok(())
            }
            Mutation::DeleteGroup { email_id } => write!(f, "delete group {email_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groupsync_directory::SettingName;

    #[test]
    fn test_display_of_member_mutations() {
        let insert = Mutation::InsertMember {
            email_id: "team@example.com".into(),
            email: "a@example.com".into(),
            role: Role::Manager,
        };
        assert_eq!(insert.to_string(), "add a@example.com to team@example.com as MANAGER");

        let update = Mutation::UpdateMemberRole {
            email_id: "team@example.com".into(),
            member_id: "m1".into(),
            email: "a@example.com".into(),
            from: Role::Member,
            to: Role::Owner,
        };
        assert_eq!(
            update.to_string(),
            "change role of a@example.com in team@example.com from MEMBER to OWNER"
        );
    }

    #[test]
    fn test_update_group_lists_only_changed_fields() {
        let mutation = Mutation::UpdateGroup {
            email_id: "team@example.com".into(),
            group: Group::new("team@example.com").with_name("New"),
            previous: Group::new("team@example.com")
                .with_name("Old")
                .with_description("Same"),
        };
        assert_eq!(
            mutation.to_string(),
            "update group team@example.com: name \"Old\" -> \"New\""
        );
    }

    #[test]
    fn test_patch_settings_lists_changes() {
        let mutation = Mutation::PatchSettings {
            email_id: "team@example.com".into(),
            settings: SettingsMap::new(),
            changes: vec![
                SettingChange {
                    name: SettingName::WhoCanJoin,
                    have: Some("CAN_REQUEST_TO_JOIN".into()),
                    want: "INVITED_CAN_JOIN".into(),
                },
                SettingChange {
                    name: SettingName::AllowWebPosting,
                    have: None,
                    want: "false".into(),
                },
            ],
        };
        assert_eq!(
            mutation.to_string(),
            "update settings of team@example.com: WhoCanJoin CAN_REQUEST_TO_JOIN -> INVITED_CAN_JOIN, AllowWebPosting <unset> -> false"
        );
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let json = serde_json::to_value(Mutation::DeleteGroup {
            email_id: "old@example.com".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "delete_group");
        assert_eq!(json["email_id"], "old@example.com");
        assert_eq!(
            Mutation::DeleteGroup {
                email_id: "old@example.com".into()
            }
            .kind(),
            MutationKind::DeleteGroup
        );
    }
}
