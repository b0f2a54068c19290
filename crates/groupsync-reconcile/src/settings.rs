//! Settings policy: baseline defaults, per-group overrides and diffing.

use groupsync_directory::{SettingName, SettingsMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::desired::RECONCILE_MEMBERS_KEY;
use crate::plan::Mutation;

/// Defaults applied to every managed group before its overrides.
pub const BASELINE: [(SettingName, &str); 10] = [
    (SettingName::AllowExternalMembers, "true"),
    (SettingName::WhoCanJoin, "INVITED_CAN_JOIN"),
    (SettingName::WhoCanViewMembership, "ALL_MANAGERS_CAN_VIEW"),
    (SettingName::WhoCanViewGroup, "ALL_MEMBERS_CAN_VIEW"),
    (SettingName::WhoCanDiscoverGroup, "ALL_IN_DOMAIN_CAN_DISCOVER"),
    (SettingName::WhoCanModerateMembers, "OWNERS_AND_MANAGERS"),
    (SettingName::WhoCanModerateContent, "OWNERS_AND_MANAGERS"),
    (SettingName::WhoCanPostMessage, "ALL_MEMBERS_CAN_POST"),
    (SettingName::MessageModerationLevel, "MODERATE_NONE"),
    (SettingName::MembersCanPostAsTheGroup, "false"),
];

/// Settings a group may override.
pub const OVERRIDABLE: [SettingName; 10] = [
    SettingName::AllowExternalMembers,
    SettingName::AllowWebPosting,
    SettingName::WhoCanJoin,
    SettingName::WhoCanViewMembership,
    SettingName::WhoCanViewGroup,
    SettingName::WhoCanDiscoverGroup,
    SettingName::WhoCanModerateMembers,
    SettingName::WhoCanPostMessage,
    SettingName::MessageModerationLevel,
    SettingName::MembersCanPostAsTheGroup,
];

/// One setting whose observed value differs from the desired one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingChange {
    pub name: SettingName,
    /// Observed value, `None` if the directory did not report one.
    pub have: Option<String>,
    pub want: String,
}

impl fmt::Display for SettingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.name,
            self.have.as_deref().unwrap_or("<unset>"),
            self.want
        )
    }
}

/// Computes the settings a group should have.
#[derive(Debug, Clone)]
pub struct SettingsPolicy {
    baseline: SettingsMap,
}

impl Default for SettingsPolicy {
    fn default() -> Self {
        Self::new(
            BASELINE
                .iter()
                .map(|(name, value)| (*name, (*value).to_string()))
                .collect(),
        )
    }
}

impl SettingsPolicy {
    pub fn new(baseline: SettingsMap) -> Self {
        Self { baseline }
    }

    #[must_use]
    pub fn baseline(&self) -> &SettingsMap {
        &self.baseline
    }

    #[must_use]
    pub fn is_overridable(name: SettingName) -> bool {
        OVERRIDABLE.contains(&name)
    }

    /// Baseline overlaid with the recognized keys of `overrides`.
    #[must_use]
    pub fn desired_settings(&self, overrides: &BTreeMap<String, String>) -> SettingsMap {
        let mut settings = self.baseline.clone();
        for (key, value) in overrides {
            match SettingName::from_key(key) {
                Some(name) if Self::is_overridable(name) => {
                    settings.insert(name, value.clone());
                }
                _ => {}
            }
        }
        settings
    }

    /// Override keys that do not name an overridable setting.
    #[must_use]
    pub fn ignored_keys<'a>(overrides: &'a BTreeMap<String, String>) -> Vec<&'a str> {
        overrides
            .keys()
            .map(String::as_str)
            .filter(|key| *key != RECONCILE_MEMBERS_KEY)
            .filter(|key| !SettingName::from_key(key).is_some_and(Self::is_overridable))
            .collect()
    }

    /// Settings in `want` whose value in `have` differs.
    ///
    /// Only keys of `want` are compared; settings the policy does not manage
    /// never count as drift.
    #[must_use]
    pub fn diff(have: &SettingsMap, want: &SettingsMap) -> Vec<SettingChange> {
        want.iter()
            .filter(|(name, value)| have.get(*name) != Some(*value))
            .map(|(name, value)| SettingChange {
                name: *name,
                have: have.get(name).cloned(),
                want: value.clone(),
            })
            .collect()
    }

    /// Plans the settings patch for a group, if its settings drifted.
    #[must_use]
    pub fn plan(
        &self,
        email_id: &str,
        overrides: &BTreeMap<String, String>,
        observed: &SettingsMap,
    ) -> Option<Mutation> {
        let want = self.desired_settings(overrides);
        let changes = Self::diff(observed, &want);
        if changes.is_empty() {
            return None;
        }
        Some(Mutation::PatchSettings {
            email_id: email_id.to_string(),
            settings: want,
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_override_replaces_only_its_key() {
        let policy = SettingsPolicy::default();
        let want = policy.desired_settings(&overrides(&[("WhoCanJoin", "ALL_IN_DOMAIN_CAN_JOIN")]));

        assert_eq!(want[&SettingName::WhoCanJoin], "ALL_IN_DOMAIN_CAN_JOIN");
        for (name, value) in BASELINE {
            if name != SettingName::WhoCanJoin {
                assert_eq!(want[&name], value, "{name} should keep its baseline");
            }
        }
        assert_eq!(want.len(), BASELINE.len());
    }

    #[test]
    fn test_unrecognized_and_baseline_only_keys_are_ignored() {
        let policy = SettingsPolicy::default();
        let input = overrides(&[
            ("whoCanJoin", "ANYONE_CAN_JOIN"),
            ("WhoCanModerateContent", "ALL_MEMBERS"),
            ("ReconcileMembers", "true"),
        ]);

        assert_eq!(policy.desired_settings(&input), *policy.baseline());
        assert_eq!(
            SettingsPolicy::ignored_keys(&input),
            vec!["WhoCanModerateContent", "whoCanJoin"]
        );
    }

    #[test]
    fn test_allow_web_posting_is_managed_only_when_overridden() {
        let policy = SettingsPolicy::default();
        assert!(!policy
            .desired_settings(&BTreeMap::new())
            .contains_key(&SettingName::AllowWebPosting));
        assert_eq!(
            policy.desired_settings(&overrides(&[("AllowWebPosting", "false")]))
                [&SettingName::AllowWebPosting],
            "false"
        );
    }

    #[test]
    fn test_diff_ignores_unmanaged_settings() {
        let policy = SettingsPolicy::default();
        let want = policy.desired_settings(&BTreeMap::new());
        let mut have = want.clone();
        have.insert(SettingName::AllowWebPosting, "true".to_string());

        assert!(SettingsPolicy::diff(&have, &want).is_empty());
        assert!(policy.plan("team@example.com", &BTreeMap::new(), &have).is_none());
    }

    #[test]
    fn test_plan_reports_each_drifted_setting() {
        let policy = SettingsPolicy::default();
        let mut have = policy.baseline().clone();
        have.insert(SettingName::WhoCanJoin, "CAN_REQUEST_TO_JOIN".to_string());
        have.remove(&SettingName::MessageModerationLevel);

        let mutation = policy
            .plan("team@example.com", &BTreeMap::new(), &have)
            .unwrap();

        match mutation {
            Mutation::PatchSettings {
                settings, changes, ..
            } => {
                assert_eq!(settings, *policy.baseline());
                assert_eq!(
                    changes,
                    vec![
                        SettingChange {
                            name: SettingName::WhoCanJoin,
                            have: Some("CAN_REQUEST_TO_JOIN".into()),
                            want: "INVITED_CAN_JOIN".into(),
                        },
                        SettingChange {
                            name: SettingName::MessageModerationLevel,
                            have: None,
                            want: "MODERATE_NONE".into(),
                        },
                    ]
                );
            }
            other => panic!("unexpected mutation: {other:?}"),
        }
    }
}
