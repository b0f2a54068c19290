//! Run reports and statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::plan::{Mutation, MutationKind};

/// A mutation and whether it reached the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedMutation {
    #[serde(flatten)]
    pub mutation: Mutation,
    /// False for reported-only (dry-run) mutations.
    pub applied: bool,
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Desired groups reconciled.
    #[serde(default)]
    pub groups_processed: u32,
    /// Groups seen in the directory listing.
    #[serde(default)]
    pub groups_observed: u32,
    /// Steps skipped because their group does not exist yet.
    #[serde(default)]
    pub steps_skipped: u32,
    /// Mutations broken down by kind.
    #[serde(default)]
    pub mutations_by_kind: BTreeMap<MutationKind, u32>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl RunStatistics {
    #[must_use]
    pub fn count(&self, kind: MutationKind) -> u32 {
        self.mutations_by_kind.get(&kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_mutations(&self) -> u32 {
        self.mutations_by_kind.values().sum()
    }
}

/// Outcome of a completed reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Whether mutations were applied or only reported.
    pub confirm: bool,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Mutations in the order they were planned.
    pub mutations: Vec<PlannedMutation>,
    pub statistics: RunStatistics,
}

impl RunReport {
    #[must_use]
    pub fn new(confirm: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            confirm,
            started_at: Utc::now(),
            completed_at: None,
            mutations: Vec::new(),
            statistics: RunStatistics::default(),
        }
    }

    pub fn record(&mut self, mutation: Mutation, applied: bool) {
        *self
            .statistics
            .mutations_by_kind
            .entry(mutation.kind())
            .or_insert(0) += 1;
        self.mutations.push(PlannedMutation { mutation, applied });
    }

    pub fn record_skip(&mut self) {
        self.statistics.steps_skipped += 1;
    }

    /// Stamps completion time and duration.
    pub fn finish(&mut self) {
        let now = Utc::now();
        self.statistics.duration_ms = (now - self.started_at).num_milliseconds().max(0) as u64;
        self.completed_at = Some(now);
    }

    /// True when the directory already matched desired state.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.mutations.is_empty()
    }

    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.mutations.iter().filter(|m| m.applied).count()
    }

    /// Mutations addressing one group.
    pub fn mutations_for<'a>(&'a self, email_id: &'a str) -> impl Iterator<Item = &'a Mutation> {
        self.mutations
            .iter()
            .map(|m| &m.mutation)
            .filter(move |m| m.email_id() == email_id)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.confirm { "applied" } else { "dry-run" };
        writeln!(
            f,
            "Run {} ({mode}): {} groups, {} mutations, {} skipped steps",
            self.run_id,
            self.statistics.groups_processed,
            self.mutations.len(),
            self.statistics.steps_skipped,
        )?;
        for planned in &self.mutations {
            let marker = if planned.applied { "applied" } else { "planned" };
            writeln!(f, "  [{marker}] {}", planned.mutation)?;
        }
        Ok(())
    }
}
