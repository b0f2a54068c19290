//! Reconciliation engine orchestrator.
//!
//! Drives one run: every desired group in declaration order (existence,
//! settings, OWNER/MANAGER/MEMBER passes, removal), then orphan pruning.
//! The first directory failure other than not-found aborts the run.

use groupsync_directory::{DirectoryError, DirectoryPort, Group, Member, Role, SettingsMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::desired::{DesiredGroup, DesiredStateStore};
use crate::error::{ReconcileError, ReconcileResult, ValidationError};
use crate::existence::plan_existence;
use crate::membership::{plan_removals, plan_role, project, RemovalPolicy};
use crate::orphans::plan_orphans;
use crate::plan::Mutation;
use crate::report::RunReport;
use crate::settings::SettingsPolicy;

/// Everything a run needs besides the directory.
#[derive(Debug, Clone)]
pub struct ReconciliationContext {
    pub desired: DesiredStateStore,
    /// Apply mutations when true, only report them otherwise.
    pub confirm: bool,
    pub settings_policy: SettingsPolicy,
}

impl ReconciliationContext {
    pub fn new(desired: DesiredStateStore, confirm: bool) -> Self {
        Self {
            desired,
            confirm,
            settings_policy: SettingsPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_settings_policy(mut self, policy: SettingsPolicy) -> Self {
        self.settings_policy = policy;
        self
    }
}

/// Turns a directory answer into `Some`, `None` for not-found, or a fatal error.
fn found<T>(
    result: Result<T, DirectoryError>,
    operation: &'static str,
    email_id: &str,
) -> ReconcileResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(ReconcileError::directory(operation, email_id, e)),
    }
}

/// Reconciles desired state into a directory.
pub struct ReconciliationEngine<D: ?Sized> {
    directory: Arc<D>,
    context: ReconciliationContext,
}

impl<D: DirectoryPort + ?Sized> ReconciliationEngine<D> {
    pub fn new(directory: Arc<D>, context: ReconciliationContext) -> Self {
        Self { directory, context }
    }

    #[must_use]
    pub fn context(&self) -> &ReconciliationContext {
        &self.context
    }

    /// Runs one full reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns the first validation or directory failure; nothing after it
    /// is attempted.
    pub async fn run(&self) -> ReconcileResult<RunReport> {
        let mut report = RunReport::new(self.context.confirm);

        info!(
            run_id = %report.run_id,
            confirm = self.context.confirm,
            groups = self.context.desired.len(),
            "Starting reconciliation run"
        );

        for group in self.context.desired.groups() {
            self.reconcile_group(group, &mut report).await?;
        }

        self.prune_orphans(&mut report).await?;

        report.finish();
        info!(
            run_id = %report.run_id,
            confirm = self.context.confirm,
            mutations = report.mutations.len(),
            applied = report.applied_count(),
            skipped = report.statistics.steps_skipped,
            duration_ms = report.statistics.duration_ms,
            "Reconciliation run completed"
        );

        Ok(report)
    }

    async fn reconcile_group(
        &self,
        group: &DesiredGroup,
        report: &mut RunReport,
    ) -> ReconcileResult<()> {
        // `DesiredStateStore::load` already rejects these; the engine still
        // never addresses an empty group key.
        if group.email_id.is_empty() {
            return Err(ValidationError::MissingIdentity {
                record: group.name.clone(),
            }
            .into());
        }
        let email_id = group.email_id.as_str();
        debug!(email_id, "Reconciling group");

        self.reconcile_existence(group, report).await?;
        self.reconcile_settings(group, report).await?;

        // Reported-only member mutations, replayed onto each fresh listing.
        let mut pending: Vec<Mutation> = Vec::new();

        for role in Role::ALL {
            let Some(observed) = self.observed_members(email_id, &pending, report).await? else {
                continue;
            };
            let emails = group.members_for(role);
            for mutation in plan_role(email_id, role, &emails, &observed) {
                self.dispatch(mutation, &mut pending, report).await?;
            }
        }

        let policy = RemovalPolicy::for_group(group);
        if let Some(observed) = self.observed_members(email_id, &pending, report).await? {
            debug!(email_id, policy = %policy, "Checking for surplus members");
            for mutation in plan_removals(group, policy, &observed) {
                self.dispatch(mutation, &mut pending, report).await?;
            }
        }

        report.statistics.groups_processed += 1;
        Ok(())
    }

    async fn reconcile_existence(
        &self,
        group: &DesiredGroup,
        report: &mut RunReport,
    ) -> ReconcileResult<()> {
        let email_id = group.email_id.as_str();
        let observed: Option<Group> = found(
            self.directory.get_group(email_id).await,
            "get_group",
            email_id,
        )?;

        if let Some(mutation) = plan_existence(group, observed.as_ref()) {
            self.dispatch(mutation, &mut Vec::new(), report).await?;
        }
        Ok(())
    }

    async fn reconcile_settings(
        &self,
        group: &DesiredGroup,
        report: &mut RunReport,
    ) -> ReconcileResult<()> {
        let email_id = group.email_id.as_str();

        let ignored = SettingsPolicy::ignored_keys(&group.settings);
        if !ignored.is_empty() {
            warn!(email_id, keys = ?ignored, "Ignoring unrecognized settings");
        }

        let observed: Option<SettingsMap> = found(
            self.directory.get_settings(email_id).await,
            "get_settings",
            email_id,
        )?;
        let Some(observed) = observed else {
            info!(email_id, step = "settings", "Group does not exist yet, skipping");
            report.record_skip();
            return Ok(());
        };

        if let Some(mutation) = self
            .context
            .settings_policy
            .plan(email_id, &group.settings, &observed)
        {
            self.dispatch(mutation, &mut Vec::new(), report).await?;
        }
        Ok(())
    }

    /// Fresh member listing with pending (reported-only) mutations applied.
    async fn observed_members(
        &self,
        email_id: &str,
        pending: &[Mutation],
        report: &mut RunReport,
    ) -> ReconcileResult<Option<Vec<Member>>> {
        let listed = found(
            self.directory.list_members(email_id).await,
            "list_members",
            email_id,
        )?;
        match listed {
            Some(members) => Ok(Some(project(members, pending))),
            None => {
                info!(email_id, step = "members", "Group does not exist yet, skipping");
                report.record_skip();
                Ok(None)
            }
        }
    }

    async fn prune_orphans(&self, report: &mut RunReport) -> ReconcileResult<()> {
        let observed = self
            .directory
            .list_groups()
            .await
            .map_err(|e| ReconcileError::directory("list_groups", "*", e))?;
        report.statistics.groups_observed = u32::try_from(observed.len()).unwrap_or(u32::MAX);

        for mutation in plan_orphans(&self.context.desired, &observed) {
            self.dispatch(mutation, &mut Vec::new(), report).await?;
        }
        Ok(())
    }

    /// Applies or reports one mutation.
    async fn dispatch(
        &self,
        mutation: Mutation,
        pending: &mut Vec<Mutation>,
        report: &mut RunReport,
    ) -> ReconcileResult<()> {
        let kind = mutation.kind();
        let email_id = mutation.email_id().to_string();

        if !self.context.confirm {
            info!(email_id = %email_id, kind = %kind, dry_run = true, "dry-run: {mutation}");
            pending.push(mutation.clone());
            report.record(mutation, false);
            return Ok(());
        }

        info!(email_id = %email_id, kind = %kind, "{mutation}");
        self.apply(&mutation)
            .await
            .map_err(|e| ReconcileError::directory(kind.as_str(), email_id, e))?;
        report.record(mutation, true);
        Ok(())
    }

    async fn apply(&self, mutation: &Mutation) -> Result<(), DirectoryError> {
        let directory = &self.directory;
        match mutation {
            Mutation::CreateGroup { group } => directory.create_group(group).await.map(|_| ()),
            Mutation::UpdateGroup {
                email_id, group, ..
            } => directory.update_group(email_id, group).await.map(|_| ()),
            Mutation::InsertMember {
                email_id,
                email,
                role,
            } => directory.insert_member(email_id, email, *role).await,
            Mutation::UpdateMemberRole {
                email_id,
                member_id,
                to,
                ..
            } => directory.update_member_role(email_id, member_id, *to).await,
            Mutation::DeleteMember {
                email_id,
                member_id,
                ..
            } => directory.delete_member(email_id, member_id).await,
            Mutation::PatchSettings {
                email_id, settings, ..
            } => directory.patch_settings(email_id, settings).await,
            Mutation::DeleteGroup { email_id } => directory.delete_group(email_id).await,
        }
    }
}
