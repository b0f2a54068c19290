//! Membership planning: role passes and removal policies.

use groupsync_directory::{Member, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::desired::DesiredGroup;
use crate::plan::Mutation;

/// Which surplus members a group sheds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Anyone not declared in any role is removed.
    Strict,
    /// Only undeclared owners and managers are removed; plain members
    /// manage themselves.
    PrivilegedOnly,
}

impl RemovalPolicy {
    #[must_use]
    pub fn for_group(group: &DesiredGroup) -> Self {
        if group.reconcile_members() {
            RemovalPolicy::Strict
        } else {
            RemovalPolicy::PrivilegedOnly
        }
    }
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalPolicy::Strict => f.write_str("strict"),
            RemovalPolicy::PrivilegedOnly => f.write_str("privileged-only"),
        }
    }
}

/// Plans inserts and role changes so that every address in `emails` holds
/// `role` in group `email_id`.
#[must_use]
pub fn plan_role(email_id: &str, role: Role, emails: &[&str], observed: &[Member]) -> Vec<Mutation> {
    let mut plan = Vec::new();
    for email in emails {
        match observed.iter().find(|m| m.email == *email) {
            Some(member) if member.role == role => {}
            Some(member) => plan.push(Mutation::UpdateMemberRole {
                email_id: email_id.to_string(),
                member_id: member.id.clone(),
                email: member.email.clone(),
                from: member.role,
                to: role,
            }),
            None => plan.push(Mutation::InsertMember {
                email_id: email_id.to_string(),
                email: (*email).to_string(),
                role,
            }),
        }
    }
    plan
}

/// Plans deletes for observed members the policy does not allow.
#[must_use]
pub fn plan_removals(
    desired: &DesiredGroup,
    policy: RemovalPolicy,
    observed: &[Member],
) -> Vec<Mutation> {
    let keep = match policy {
        RemovalPolicy::Strict => desired.all_members(),
        RemovalPolicy::PrivilegedOnly => desired.privileged_members(),
    };

    observed
        .iter()
        .filter(|m| policy == RemovalPolicy::Strict || m.role.is_privileged())
        .filter(|m| !keep.contains(m.email.as_str()))
        .map(|m| Mutation::DeleteMember {
            email_id: desired.email_id.clone(),
            member_id: m.id.clone(),
            email: m.email.clone(),
            role: m.role,
        })
        .collect()
}

/// Applies not-yet-applied member mutations to an observed list.
///
/// Used when mutations are only reported, so later passes plan against the
/// state earlier passes would have produced.
#[must_use]
pub fn project(mut observed: Vec<Member>, pending: &[Mutation]) -> Vec<Member> {
    for mutation in pending {
        match mutation {
            Mutation::InsertMember { email, role, .. } => {
                if !observed.iter().any(|m| m.email == *email) {
                    observed.push(Member {
                        id: String::new(),
                        email: email.clone(),
                        role: *role,
                    });
                }
            }
            Mutation::UpdateMemberRole { email, to, .. } => {
                if let Some(member) = observed.iter_mut().find(|m| m.email == *email) {
                    member.role = *to;
                }
            }
            Mutation::DeleteMember { email, .. } => observed.retain(|m| m.email != *email),
            _ => {}
        }
    }
    observed
}
