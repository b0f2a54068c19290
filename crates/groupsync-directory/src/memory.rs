//! In-memory directory.
//!
//! Behaves like the real service for the operations reconciliation uses:
//! groups are keyed by email, memberships get generated ids, new groups start
//! from a configurable set of default settings. Every call is recorded and
//! failures can be injected per operation.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::Mutex;

use crate::port::DirectoryPort;
use crate::types::{Group, Member, Role, SettingsMap};
use crate::{DirectoryError, DirectoryResult};

/// Directory operation, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    GetGroup,
    CreateGroup,
    UpdateGroup,
    DeleteGroup,
    ListGroups,
    ListMembers,
    InsertMember,
    UpdateMemberRole,
    DeleteMember,
    GetSettings,
    PatchSettings,
}

impl Operation {
    /// Whether the operation changes directory state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::CreateGroup
                | Operation::UpdateGroup
                | Operation::DeleteGroup
                | Operation::InsertMember
                | Operation::UpdateMemberRole
                | Operation::DeleteMember
                | Operation::PatchSettings
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::GetGroup => "get_group",
            Operation::CreateGroup => "create_group",
            Operation::UpdateGroup => "update_group",
            Operation::DeleteGroup => "delete_group",
            Operation::ListGroups => "list_groups",
            Operation::ListMembers => "list_members",
            Operation::InsertMember => "insert_member",
            Operation::UpdateMemberRole => "update_member_role",
            Operation::DeleteMember => "delete_member",
            Operation::GetSettings => "get_settings",
            Operation::PatchSettings => "patch_settings",
        };
        f.write_str(name)
    }
}

/// One call received by [`InMemoryDirectory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: Operation,
    /// Group the call addressed; empty for `list_groups`.
    pub email_id: String,
    /// Member email (insert) or member id (update/delete).
    pub member: Option<String>,
    pub role: Option<Role>,
    pub settings: Option<SettingsMap>,
}

impl RecordedCall {
    fn new(operation: Operation, email_id: &str) -> Self {
        Self {
            operation,
            email_id: email_id.to_string(),
            member: None,
            role: None,
            settings: None,
        }
    }
}

#[derive(Debug)]
struct InjectedFailure {
    operation: Operation,
    email_id: Option<String>,
    status: u16,
    remaining: u32,
}

impl InjectedFailure {
    fn matches(&self, call: &RecordedCall) -> bool {
        self.remaining > 0
            && self.operation == call.operation
            && self.email_id.as_ref().map_or(true, |e| *e == call.email_id)
    }

    fn to_error(&self, email_id: &str) -> DirectoryError {
        match self.status {
            404 => DirectoryError::not_found(format!("group {email_id}")),
            429 => DirectoryError::RateLimited {
                retry_after_secs: None,
            },
            401 => DirectoryError::Auth("injected failure".to_string()),
            status => DirectoryError::Api {
                status,
                message: "injected failure".to_string(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct State {
    groups: BTreeMap<String, Group>,
    members: BTreeMap<String, Vec<Member>>,
    settings: BTreeMap<String, SettingsMap>,
    default_settings: SettingsMap,
    calls: Vec<RecordedCall>,
    failures: Vec<InjectedFailure>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    /// Logs the call and fires a matching injected failure, if any.
    fn enter(&mut self, call: RecordedCall) -> DirectoryResult<()> {
        let email_id = call.email_id.clone();
        let failure = self.failures.iter_mut().find(|f| f.matches(&call));
        let result = match failure {
            Some(failure) => {
                failure.remaining -= 1;
                Err(failure.to_error(&email_id))
            }
            None => Ok(()),
        };
        self.calls.push(call);
        result
    }

    fn require_group(&self, email_id: &str) -> DirectoryResult<()> {
        if self.groups.contains_key(email_id) {
            Ok(())
        } else {
            Err(DirectoryError::not_found(format!("group {email_id}")))
        }
    }

    fn members_mut(&mut self, email_id: &str) -> DirectoryResult<&mut Vec<Member>> {
        self.require_group(email_id)?;
        Ok(self.members.entry(email_id.to_string()).or_default())
    }
}

/// A [`DirectoryPort`] backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings every newly created group starts with.
    #[must_use]
    pub fn with_default_settings(mut self, settings: SettingsMap) -> Self {
        self.state.get_mut().default_settings = settings;
        self
    }

    /// Seeds an existing group with the default settings.
    #[must_use]
    pub fn with_group(mut self, mut group: Group) -> Self {
        let state = self.state.get_mut();
        if group.id.is_none() {
            group.id = Some(state.next_id("g"));
        }
        let email = group.email.clone();
        let defaults = state.default_settings.clone();
        state.settings.entry(email.clone()).or_insert(defaults);
        state.members.entry(email.clone()).or_default();
        state.groups.insert(email, group);
        self
    }

    /// Seeds a membership of an already seeded group.
    #[must_use]
    pub fn with_member(mut self, email_id: &str, email: &str, role: Role) -> Self {
        let state = self.state.get_mut();
        let id = state.next_id("m");
        state.members.entry(email_id.to_string()).or_default().push(Member {
            id,
            email: email.to_string(),
            role,
        });
        self
    }

    /// Overwrites the stored settings of a seeded group.
    #[must_use]
    pub fn with_settings(mut self, email_id: &str, settings: SettingsMap) -> Self {
        self.state
            .get_mut()
            .settings
            .insert(email_id.to_string(), settings);
        self
    }

    /// Makes the next `times` calls of `operation` fail with `status`.
    ///
    /// With `email_id` set, only calls addressing that group fail.
    pub async fn inject_failure(
        &self,
        operation: Operation,
        email_id: Option<&str>,
        status: u16,
        times: u32,
    ) {
        self.state.lock().await.failures.push(InjectedFailure {
            operation,
            email_id: email_id.map(str::to_string),
            status,
            remaining: times,
        });
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    /// Calls that would have changed directory state.
    pub async fn mutation_calls(&self) -> Vec<RecordedCall> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| c.operation.is_mutation())
            .cloned()
            .collect()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn group(&self, email_id: &str) -> Option<Group> {
        self.state.lock().await.groups.get(email_id).cloned()
    }

    pub async fn group_emails(&self) -> Vec<String> {
        self.state.lock().await.groups.keys().cloned().collect()
    }

    pub async fn members_of(&self, email_id: &str) -> Vec<Member> {
        self.state
            .lock()
            .await
            .members
            .get(email_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn settings_of(&self, email_id: &str) -> Option<SettingsMap> {
        self.state.lock().await.settings.get(email_id).cloned()
    }
}

#[async_trait]
impl DirectoryPort for InMemoryDirectory {
    async fn get_group(&self, email_id: &str) -> DirectoryResult<Group> {
        let mut state = self.state.lock().await;
        state.enter(RecordedCall::new(Operation::GetGroup, email_id))?;
        state
            .groups
            .get(email_id)
            .cloned()
            .ok_or_else(|| DirectoryError::not_found(format!("group {email_id}")))
    }

    async fn create_group(&self, group: &Group) -> DirectoryResult<Group> {
        let mut state = self.state.lock().await;
        state.enter(RecordedCall::new(Operation::CreateGroup, &group.email))?;
        if state.groups.contains_key(&group.email) {
            return Err(DirectoryError::Api {
                status: 409,
                message: "Entity already exists.".to_string(),
            });
        }

        let mut created = group.clone();
        created.id = Some(state.next_id("g"));
        let defaults = state.default_settings.clone();
        state.settings.insert(group.email.clone(), defaults);
        state.members.insert(group.email.clone(), Vec::new());
        state.groups.insert(group.email.clone(), created.clone());
        Ok(created)
    }

    async fn update_group(&self, email_id: &str, group: &Group) -> DirectoryResult<Group> {
        let mut state = self.state.lock().await;
        state.enter(RecordedCall::new(Operation::UpdateGroup, email_id))?;
        let stored = state
            .groups
            .get_mut(email_id)
            .ok_or_else(|| DirectoryError::not_found(format!("group {email_id}")))?;
        if !group.name.is_empty() {
            stored.name = group.name.clone();
        }
        if !group.description.is_empty() {
            stored.description = group.description.clone();
        }
        Ok(stored.clone())
    }

    async fn delete_group(&self, email_id: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock().await;
        state.enter(RecordedCall::new(Operation::DeleteGroup, email_id))?;
        state.require_group(email_id)?;
        state.groups.remove(email_id);
        state.members.remove(email_id);
        state.settings.remove(email_id);
        Ok(())
    }

    async fn list_groups(&self) -> DirectoryResult<Vec<Group>> {
        let mut state = self.state.lock().await;
        state.enter(RecordedCall::new(Operation::ListGroups, ""))?;
        Ok(state.groups.values().cloned().collect())
    }

    async fn list_members(&self, email_id: &str) -> DirectoryResult<Vec<Member>> {
        let mut state = self.state.lock().await;
        state.enter(RecordedCall::new(Operation::ListMembers, email_id))?;
        Ok(state.members_mut(email_id)?.clone())
    }

    async fn insert_member(&self, email_id: &str, email: &str, role: Role) -> DirectoryResult<()> {
        let mut state = self.state.lock().await;
        let mut call = RecordedCall::new(Operation::InsertMember, email_id);
        call.member = Some(email.to_string());
        call.role = Some(role);
        state.enter(call)?;

        let id = state.next_id("m");
        let members = state.members_mut(email_id)?;
        if members.iter().any(|m| m.email == email) {
            return Err(DirectoryError::Api {
                status: 409,
                message: "Member already exists.".to_string(),
            });
        }
        members.push(Member {
            id,
            email: email.to_string(),
            role,
        });
        Ok(())
    }

    async fn update_member_role(
        &self,
        email_id: &str,
        member_id: &str,
        role: Role,
    ) -> DirectoryResult<()> {
        let mut state = self.state.lock().await;
        let mut call = RecordedCall::new(Operation::UpdateMemberRole, email_id);
        call.member = Some(member_id.to_string());
        call.role = Some(role);
        state.enter(call)?;

        let member = state
            .members_mut(email_id)?
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| DirectoryError::not_found(format!("member {member_id}")))?;
        member.role = role;
        Ok(())
    }

    async fn delete_member(&self, email_id: &str, member_id: &str) -> DirectoryResult<()> {
        let mut state = self.state.lock().await;
        let mut call = RecordedCall::new(Operation::DeleteMember, email_id);
        call.member = Some(member_id.to_string());
        state.enter(call)?;

        let members = state.members_mut(email_id)?;
        let before = members.len();
        members.retain(|m| m.id != member_id);
        if members.len() == before {
            return Err(DirectoryError::not_found(format!("member {member_id}")));
        }
        Ok(())
    }

    async fn get_settings(&self, email_id: &str) -> DirectoryResult<SettingsMap> {
        let mut state = self.state.lock().await;
        state.enter(RecordedCall::new(Operation::GetSettings, email_id))?;
        state.require_group(email_id)?;
        Ok(state.settings.get(email_id).cloned().unwrap_or_default())
    }

    async fn patch_settings(&self, email_id: &str, settings: &SettingsMap) -> DirectoryResult<()> {
        let mut state = self.state.lock().await;
        let mut call = RecordedCall::new(Operation::PatchSettings, email_id);
        call.settings = Some(settings.clone());
        state.enter(call)?;

        state.require_group(email_id)?;
        state
            .settings
            .entry(email_id.to_string())
            .or_default()
            .extend(settings.iter().map(|(k, v)| (*k, v.clone())));
        Ok(())
    }
}
