//! Driving port for bearer-token ownership checks.

use async_trait::async_trait;

use crate::domain::{BearerToken, Error, Resource};

/// Domain use-case port for authorization.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorizationQuery: Send + Sync {
    /// Whether the identity behind `token` owns `resource`.
    ///
    /// `Ok(false)` means "not the owner"; token and store failures are
    /// reported as errors.
    async fn is_authorized(&self, resource: Resource, token: &BearerToken) -> Result<bool, Error>;
}
