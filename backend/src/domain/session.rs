//! Login, logout, and password reset against the identity provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::failures::identity_failure;
use super::ports::{IdentityProvider, IdentityProviderError, SessionCommand};
use super::{Email, Error, IdentityFilter, LoginCredentials, RefreshToken, SessionTokens};
use crate::telemetry::Telemetry;

/// Session service implementing [`SessionCommand`].
pub struct SessionService<P> {
    identity_provider: Arc<P>,
    telemetry: Telemetry,
}

impl<P> SessionService<P> {
    /// Create a session service.
    pub fn new(identity_provider: Arc<P>, telemetry: Telemetry) -> Self {
        Self {
            identity_provider,
            telemetry,
        }
    }
}

impl<P> SessionService<P>
where
    P: IdentityProvider,
{
    async fn login_inner(&self, credentials: &LoginCredentials) -> Result<SessionTokens, Error> {
        let known = self
            .identity_provider
            .identity_exists_by_email(credentials.email())
            .await
            .map_err(|err| identity_failure("look up identity", err))?;
        if !known {
            return Err(Error::user_not_exists());
        }

        match self.identity_provider.login_with_credentials(credentials).await {
            Ok(tokens) => Ok(tokens),
            Err(IdentityProviderError::InvalidCredentials) => Err(Error::invalid_credentials()),
            Err(IdentityProviderError::EmailNotVerified) => Err(Error::email_not_verified()),
            Err(err) => Err(identity_failure("log in", err)),
        }
    }

    async fn logout_inner(&self, refresh_token: &RefreshToken) -> Result<(), Error> {
        match self.identity_provider.logout(refresh_token).await {
            Ok(()) => Ok(()),
            Err(IdentityProviderError::InvalidToken { .. }) => Err(Error::invalid_token()),
            Err(err) => Err(identity_failure("log out", err)),
        }
    }

    async fn password_reset_inner(&self, email: &Email) -> Result<(), Error> {
        let identities = self
            .identity_provider
            .find_identities(&IdentityFilter::ByEmail(email.clone()))
            .await
            .map_err(|err| identity_failure("look up identity", err))?;
        let Some(identity) = identities.into_iter().next() else {
            return Err(Error::user_not_exists());
        };

        self.identity_provider
            .send_password_reset_email(&identity.auth_id)
            .await
            .map_err(|err| identity_failure("send password reset email", err))?;
        info!(auth_id = %identity.auth_id, "password reset email sent");
        Ok(())
    }
}

#[async_trait]
impl<P> SessionCommand for SessionService<P>
where
    P: IdentityProvider,
{
    async fn login(&self, credentials: &LoginCredentials) -> Result<SessionTokens, Error> {
        self.telemetry.scope(self.login_inner(credentials)).await
    }

    async fn logout(&self, refresh_token: &RefreshToken) -> Result<(), Error> {
        self.telemetry.scope(self.logout_inner(refresh_token)).await
    }

    async fn request_password_reset(&self, email: &Email) -> Result<(), Error> {
        self.telemetry.scope(self.password_reset_inner(email)).await
    }
}
