//! Bearer token supply for directory requests.
//!
//! Acquiring tokens (service-account key exchange, delegation) happens outside
//! this crate; the client only asks a source for the current token.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use std::fmt;

use crate::{DirectoryError, DirectoryResult};

/// Supplies bearer tokens to the directory client.
#[async_trait]
pub trait AccessTokenSource: Send + Sync + fmt::Debug {
    /// Returns a token valid for at least the next request.
    async fn bearer_token(&self) -> DirectoryResult<String>;
}

/// A fixed token handed over by the caller.
pub struct StaticToken {
    token: Secret<String>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token.into()),
        }
    }

    /// Reads the token from environment variable `var`.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Auth`] if the variable is unset or blank.
    pub fn from_env(var: &str) -> DirectoryResult<Self> {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(DirectoryError::Auth(format!(
                "environment variable {var} is not set"
            ))),
        }
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticToken")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn bearer_token(&self) -> DirectoryResult<String> {
        Ok(self.token.expose_secret().clone())
    }
}
