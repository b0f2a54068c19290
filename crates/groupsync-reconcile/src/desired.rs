//! Desired state: the operator-authored group records.

use groupsync_directory::{Group, Role};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::ValidationError;

/// Longest description the directory accepts, in Unicode scalar values.
pub const MAX_DESCRIPTION_CHARS: usize = 300;

/// Per-group settings key selecting strict member removal.
pub const RECONCILE_MEMBERS_KEY: &str = "ReconcileMembers";

/// Target state of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DesiredGroup {
    #[serde(default)]
    pub email_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Setting overrides keyed by setting name, plus `ReconcileMembers`.
    #[serde(
        default,
        deserialize_with = "deserialize_settings",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub settings: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

/// YAML scalars accepted as setting values (`true`, `42`, `"text"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum SettingValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn deserialize_settings<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, SettingValue>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                SettingValue::Bool(b) => b.to_string(),
                SettingValue::Int(i) => i.to_string(),
                SettingValue::Text(s) => s,
            };
            (key, value)
        })
        .collect())
}

impl DesiredGroup {
    pub fn new(email_id: impl Into<String>) -> Self {
        Self {
            email_id: email_id.into(),
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

    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Appends `emails` to the list for `role`.
    #[must_use]
    pub fn with_role<I, S>(mut self, role: Role, emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = match role {
            Role::Owner => &mut self.owners,
            Role::Manager => &mut self.managers,
            Role::Member => &mut self.members,
        };
        list.extend(emails.into_iter().map(Into::into));
        self
    }

    /// Addresses as declared for `role`, without precedence applied.
    #[must_use]
    pub fn declared(&self, role: Role) -> &[String] {
        match role {
            Role::Owner => &self.owners,
            Role::Manager => &self.managers,
            Role::Member => &self.members,
        }
    }

    /// Addresses that should hold `role`.
    ///
    /// An address declared under several roles only counts for the one with
    /// the highest precedence (OWNER, then MANAGER, then MEMBER). Duplicates
    /// are dropped, declaration order is kept.
    #[must_use]
    pub fn members_for(&self, role: Role) -> Vec<&str> {
        let higher: HashSet<&str> = Role::ALL
            .iter()
            .filter(|r| **r < role)
            .flat_map(|r| self.declared(*r))
            .map(String::as_str)
            .collect();

        let mut seen = HashSet::new();
        self.declared(role)
            .iter()
            .map(String::as_str)
            .filter(|email| !higher.contains(email) && seen.insert(*email))
            .collect()
    }

    /// Every address the group should contain, any role.
    #[must_use]
    pub fn all_members(&self) -> BTreeSet<&str> {
        Role::ALL
            .iter()
            .flat_map(|r| self.declared(*r))
            .map(String::as_str)
            .collect()
    }

    /// Addresses that should hold OWNER or MANAGER.
    #[must_use]
    pub fn privileged_members(&self) -> BTreeSet<&str> {
        self.owners
            .iter()
            .chain(&self.managers)
            .map(String::as_str)
            .collect()
    }

    /// Whether members outside the declared lists get removed regardless of role.
    #[must_use]
    pub fn reconcile_members(&self) -> bool {
        self.settings
            .get(RECONCILE_MEMBERS_KEY)
            .is_some_and(|v| v == "true")
    }

    /// Group fields to write; empty fields stay unset.
    #[must_use]
    pub fn to_group(&self) -> Group {
        Group::new(self.email_id.clone())
            .with_name(self.name.clone())
            .with_description(self.description.clone())
    }

    /// Checks the record on its own.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self, record: usize) -> Result<(), ValidationError> {
        if self.email_id.trim().is_empty() {
            return Err(ValidationError::MissingIdentity {
                record: if self.name.is_empty() {
                    format!("#{record}")
                } else {
                    format!("#{record} ({})", self.name)
                },
            });
        }

        let length = self.description.chars().count();
        if length > MAX_DESCRIPTION_CHARS {
            return Err(ValidationError::DescriptionTooLong {
                email_id: self.email_id.clone(),
                length,
            });
        }

        let mut roles: HashMap<&str, Role> = HashMap::new();
        for role in Role::ALL {
            for member in self.declared(role) {
                match roles.get(member.as_str()) {
                    Some(first) if *first == role => {
                        return Err(ValidationError::DuplicateMember {
                            email_id: self.email_id.clone(),
                            member: member.clone(),
                        });
                    }
                    Some(first) => {
                        return Err(ValidationError::ConflictingRoles {
                            email_id: self.email_id.clone(),
                            member: member.clone(),
                            first: *first,
                            second: role,
                        });
                    }
                    None => {
                        roles.insert(member.as_str(), role);
                    }
                }
            }
        }

        Ok(())
    }
}

/// A `groups.yaml` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupsDocument {
    #[serde(default)]
    pub groups: Vec<DesiredGroup>,
}

/// Validated desired state, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DesiredStateStore {
    groups: Vec<DesiredGroup>,
    index: HashMap<String, usize>,
}

impl DesiredStateStore {
    /// Validates and indexes merged group records.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for the first record that has no
    /// identity, repeats an identity, exceeds the description limit or
    /// lists an address twice.
    pub fn load(groups: Vec<DesiredGroup>) -> Result<Self, ValidationError> {
        let mut index = HashMap::with_capacity(groups.len());
        for (position, group) in groups.iter().enumerate() {
            group.validate(position)?;
            if index.insert(group.email_id.clone(), position).is_some() {
                return Err(ValidationError::DuplicateIdentity {
                    email_id: group.email_id.clone(),
                });
            }
        }
        Ok(Self { groups, index })
    }

    #[must_use]
    pub fn groups(&self) -> &[DesiredGroup] {
        &self.groups
    }

    #[must_use]
    pub fn get(&self, email_id: &str) -> Option<&DesiredGroup> {
        self.index.get(email_id).map(|i| &self.groups[*i])
    }

    #[must_use]
    pub fn contains(&self, email_id: &str) -> bool {
        self.index.contains_key(email_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
