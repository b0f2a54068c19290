//! Directory domain types: groups, memberships, roles and settings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Membership privilege tier within a group.
///
/// Variants are declared in precedence order: when one address is claimed
/// by several roles, the earlier variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full control over the group.
    Owner,
    /// Can manage members and moderate.
    Manager,
    /// Plain member.
    Member,
}

impl Role {
    /// All roles in reconciliation order.
    pub const ALL: [Role; 3] = [Role::Owner, Role::Manager, Role::Member];

    /// Wire representation used by the directory.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Manager => "MANAGER",
            Role::Member => "MEMBER",
        }
    }

    /// Parses the directory's wire representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OWNER" => Some(Role::Owner),
            "MANAGER" => Some(Role::Manager),
            "MEMBER" => Some(Role::Member),
            _ => None,
        }
    }

    /// Owners and managers are privileged; plain members are not.
    #[must_use]
    pub fn is_privileged(&self) -> bool {
        !matches!(self, Role::Member)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A group as stored by the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Directory-assigned identifier, absent on groups not created yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Group email address (identity key).
    pub email: String,
    /// Display name. Empty means "not set" on writes.
    #[serde(default)]
    pub name: String,
    /// Free-text description. Empty means "not set" on writes.
    #[serde(default)]
    pub description: String,
}

impl Group {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One membership entry of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Directory-assigned member key, used for update and delete calls.
    pub id: String,
    pub email: String,
    pub role: Role,
}

/// Behavioral settings known to this crate.
///
/// The variant name doubles as the configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SettingName {
    AllowExternalMembers,
    AllowWebPosting,
    WhoCanJoin,
    WhoCanViewMembership,
    WhoCanViewGroup,
    WhoCanDiscoverGroup,
    WhoCanModerateMembers,
    WhoCanModerateContent,
    WhoCanPostMessage,
    MessageModerationLevel,
    MembersCanPostAsTheGroup,
}

impl SettingName {
    pub const ALL: [SettingName; 11] = [
        SettingName::AllowExternalMembers,
        SettingName::AllowWebPosting,
        SettingName::WhoCanJoin,
        SettingName::WhoCanViewMembership,
        SettingName::WhoCanViewGroup,
        SettingName::WhoCanDiscoverGroup,
        SettingName::WhoCanModerateMembers,
        SettingName::WhoCanModerateContent,
        SettingName::WhoCanPostMessage,
        SettingName::MessageModerationLevel,
        SettingName::MembersCanPostAsTheGroup,
    ];

    /// Configuration key (case-sensitive).
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            SettingName::AllowExternalMembers => "AllowExternalMembers",
            SettingName::AllowWebPosting => "AllowWebPosting",
            SettingName::WhoCanJoin => "WhoCanJoin",
            SettingName::WhoCanViewMembership => "WhoCanViewMembership",
            SettingName::WhoCanViewGroup => "WhoCanViewGroup",
            SettingName::WhoCanDiscoverGroup => "WhoCanDiscoverGroup",
            SettingName::WhoCanModerateMembers => "WhoCanModerateMembers",
            SettingName::WhoCanModerateContent => "WhoCanModerateContent",
            SettingName::WhoCanPostMessage => "WhoCanPostMessage",
            SettingName::MessageModerationLevel => "MessageModerationLevel",
            SettingName::MembersCanPostAsTheGroup => "MembersCanPostAsTheGroup",
        }
    }

    /// Field name in the settings API's JSON representation.
    #[must_use]
    pub fn api_field(&self) -> &'static str {
        match self {
            SettingName::AllowExternalMembers => "allowExternalMembers",
            SettingName::AllowWebPosting => "allowWebPosting",
            SettingName::WhoCanJoin => "whoCanJoin",
            SettingName::WhoCanViewMembership => "whoCanViewMembership",
            SettingName::WhoCanViewGroup => "whoCanViewGroup",
            SettingName::WhoCanDiscoverGroup => "whoCanDiscoverGroup",
            SettingName::WhoCanModerateMembers => "whoCanModerateMembers",
            SettingName::WhoCanModerateContent => "whoCanModerateContent",
            SettingName::WhoCanPostMessage => "whoCanPostMessage",
            SettingName::MessageModerationLevel => "messageModerationLevel",
            SettingName::MembersCanPostAsTheGroup => "membersCanPostAsTheGroup",
        }
    }

    /// Looks a setting up by its configuration key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.key() == key)
    }
}

impl fmt::Display for SettingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Typed settings of one group. Absent keys are unknown or unset.
pub type SettingsMap = BTreeMap<SettingName, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_and_order() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("owner"), None);
        assert!(Role::Owner < Role::Manager && Role::Manager < Role::Member);
        assert!(Role::Owner.is_privileged());
        assert!(!Role::Member.is_privileged());
    }

    #[test]
    fn test_setting_keys_are_case_sensitive() {
        assert_eq!(
            SettingName::from_key("WhoCanJoin"),
            Some(SettingName::WhoCanJoin)
        );
        assert_eq!(SettingName::from_key("whoCanJoin"), None);
        assert_eq!(SettingName::from_key("ReconcileMembers"), None);
    }

    #[test]
    fn test_setting_name_serializes_as_key() {
        let mut settings = SettingsMap::new();
        settings.insert(SettingName::WhoCanJoin, "INVITED_CAN_JOIN".to_string());
        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["WhoCanJoin"], "INVITED_CAN_JOIN");
    }
}
