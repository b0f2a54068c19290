//! Retry with exponential backoff around any [`DirectoryPort`].

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::port::DirectoryPort;
use crate::types::{Group, Member, Role, SettingsMap};
use crate::{DirectoryError, DirectoryResult};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay, server hints included.
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Adds up to 25% random jitter to computed delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt + 1` (0-indexed).
    fn delay_for(&self, attempt: u32, error: &DirectoryError) -> Duration {
        if let Some(secs) = error.retry_after_secs() {
            return Duration::from_secs(secs).min(self.max_delay);
        }

        let base_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);

        let delay_ms = if self.jitter {
            capped_ms * (1.0 + rand::random::<f64>() * 0.25)
        } else {
            capped_ms
        };

        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

/// Wraps a directory and retries transient failures.
///
/// Permanent failures and not-found answers pass through untouched. When the
/// retries run out the last transient error is returned inside
/// [`DirectoryError::MaxRetriesExceeded`].
#[derive(Debug)]
pub struct RetryingDirectory<D> {
    inner: D,
    config: RetryConfig,
}

impl<D: DirectoryPort> RetryingDirectory<D> {
    pub fn new(inner: D, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn with_defaults(inner: D) -> Self {
        Self::new(inner, RetryConfig::default())
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Runs `call` until it succeeds, fails permanently or runs out of
    /// retries. `call` receives the 0-indexed attempt number; attempts after
    /// the first only happen after a transient failure.
    async fn execute<T, F, Fut>(&self, operation: &'static str, mut call: F) -> DirectoryResult<T>
    where
        F: FnMut(u32) -> Fut + Send,
        Fut: Future<Output = DirectoryResult<T>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match call(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= self.config.max_retries => {
                    warn!(
                        operation,
                        attempts = attempt + 1,
                        error = %e,
                        "Giving up after transient errors"
                    );
                    return Err(DirectoryError::MaxRetriesExceeded {
                        attempts: attempt + 1,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.config.delay_for(attempt, &e);
                    debug!(
                        operation,
                        attempt = attempt + 1,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl<D: DirectoryPort> DirectoryPort for RetryingDirectory<D> {
    async fn get_group(&self, email_id: &str) -> DirectoryResult<Group> {
        self.execute("get_group", |_| self.inner.get_group(email_id))
            .await
    }

    async fn create_group(&self, group: &Group) -> DirectoryResult<Group> {
        // A create that timed out may still have been committed; its retry
        // then sees 409 and the stored group is returned instead.
        self.execute("create_group", move |attempt| async move {
            match self.inner.create_group(group).await {
                Err(e) if attempt > 0 && e.is_conflict() => {
                    debug!(email_id = %group.email, "Create was committed by an earlier attempt");
                    self.inner.get_group(&group.email).await
                }
                other => other,
            }
        })
        .await
    }

    async fn update_group(&self, email_id: &str, group: &Group) -> DirectoryResult<Group> {
        self.execute("update_group", |_| self.inner.update_group(email_id, group))
            .await
    }

    async fn delete_group(&self, email_id: &str) -> DirectoryResult<()> {
        self.execute("delete_group", |_| self.inner.delete_group(email_id))
            .await
    }

    async fn list_groups(&self) -> DirectoryResult<Vec<Group>> {
        self.execute("list_groups", |_| self.inner.list_groups()).await
    }

    async fn list_members(&self, email_id: &str) -> DirectoryResult<Vec<Member>> {
        self.execute("list_members", |_| self.inner.list_members(email_id))
            .await
    }

    async fn insert_member(&self, email_id: &str, email: &str, role: Role) -> DirectoryResult<()> {
        self.execute("insert_member", move |attempt| async move {
            match self.inner.insert_member(email_id, email, role).await {
                Err(e) if attempt > 0 && e.is_conflict() => {
                    debug!(email_id, member = email, "Insert was committed by an earlier attempt");
                    Ok(())
                }
                other => other,
            }
        })
        .await
    }

    async fn update_member_role(
        &self,
        email_id: &str,
        member_id: &str,
        role: Role,
    ) -> DirectoryResult<()> {
        self.execute("update_member_role", |_| {
            self.inner.update_member_role(email_id, member_id, role)
        })
        .await
    }

    async fn delete_member(&self, email_id: &str, member_id: &str) -> DirectoryResult<()> {
        self.execute("delete_member", |_| {
            self.inner.delete_member(email_id, member_id)
        })
        .await
    }

    async fn get_settings(&self, email_id: &str) -> DirectoryResult<SettingsMap> {
        self.execute("get_settings", |_| self.inner.get_settings(email_id))
            .await
    }

    async fn patch_settings(&self, email_id: &str, settings: &SettingsMap) -> DirectoryResult<()> {
        self.execute("patch_settings", |_| {
            self.inner.patch_settings(email_id, settings)
        })
        .await
    }
}
