//! Bearer-token ownership checks.
//!
//! The token is decoded by the identity provider into an auth id, then the
//! account store answers whether that auth id owns the addressed resource.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::failures::{identity_failure, store_failure};
use super::ports::{AccountRepository, AuthorizationQuery, IdentityProvider, IdentityProviderError};
use super::{BearerToken, Error, Resource};
use crate::telemetry::Telemetry;

/// Authorization service implementing [`AuthorizationQuery`].
pub struct AuthorizationService<P, R> {
    identity_provider: Arc<P>,
    account_repo: Arc<R>,
    telemetry: Telemetry,
}

impl<P, R> AuthorizationService<P, R> {
    /// Create an authorization service.
    pub fn new(identity_provider: Arc<P>, account_repo: Arc<R>, telemetry: Telemetry) -> Self {
        Self {
            identity_provider,
            account_repo,
            telemetry,
        }
    }
}

fn map_token_error(err: IdentityProviderError) -> Error {
    match err {
        IdentityProviderError::TokenExpired => Error::token_expired(),
        IdentityProviderError::InvalidToken { message } => {
            debug!(reason = %message, "bearer token rejected");
            Error::invalid_token()
        }
        other => identity_failure("decode token", other),
    }
}

impl<P, R> AuthorizationService<P, R>
where
    P: IdentityProvider,
    R: AccountRepository,
{
    async fn is_authorized_inner(
        &self,
        resource: Resource,
        token: &BearerToken,
    ) -> Result<bool, Error> {
        let auth_id = self
            .identity_provider
            .decode_token(token)
            .await
            .map_err(map_token_error)?;
        let owns = self
            .account_repo
            .owns_resource(resource, &auth_id)
            .await
            .map_err(|err| store_failure("check ownership", err))?;
        if !owns {
            debug!(auth_id = %auth_id, ?resource, "resource not owned by caller");
        }
        Ok(owns)
    }
}

#[async_trait]
impl<P, R> AuthorizationQuery for AuthorizationService<P, R>
where
    P: IdentityProvider,
    R: AccountRepository,
{
    async fn is_authorized(&self, resource: Resource, token: &BearerToken) -> Result<bool, Error> {
        self.telemetry
            .scope(self.is_authorized_inner(resource, token))
            .await
    }
}
