//! Driven port for the remote identity provider.
//!
//! Identities (names, email, password, verification state) are owned by the
//! provider. The domain only keeps the [`AuthId`] that correlates an account
//! with its identity.

use async_trait::async_trait;

use crate::domain::{
    AuthId, BearerToken, Email, Identity, IdentityChanges, IdentityFilter, LoginCredentials,
    NewIdentity, RefreshToken, SessionTokens,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    pub enum IdentityProviderError {
        /// The email/password pair was rejected.
        InvalidCredentials => "identity provider rejected the credentials",
        /// The identity must verify its email before logging in.
        EmailNotVerified => "identity has not verified its email",
        /// The token signature is valid but its expiry has passed.
        TokenExpired => "token has expired",
        /// The token is malformed or its signature does not verify.
        InvalidToken { message: String } => "token is invalid: {message}",
        /// The addressed identity does not exist.
        NotFound { message: String } => "identity not found: {message}",
        /// The provider refused a write because of a uniqueness conflict.
        Conflict { message: String } => "identity conflict: {message}",
        /// The provider could not be reached or timed out.
        Transport { message: String } => "identity provider unreachable: {message}",
        /// The provider answered with an unexpected status or payload.
        Rejected { message: String } => "identity provider rejected the request: {message}",
    }
}

/// Port for identity CRUD, sessions, email actions, and token decoding.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an enabled, unverified identity and return its key.
    async fn register_identity(&self, identity: &NewIdentity)
    -> Result<AuthId, IdentityProviderError>;

    /// Apply the supplied fields to an existing identity.
    async fn update_identity(
        &self,
        auth_id: &AuthId,
        changes: &IdentityChanges,
    ) -> Result<(), IdentityProviderError>;

    /// Exchange credentials for session tokens.
    async fn login_with_credentials(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<SessionTokens, IdentityProviderError>;

    /// End the session bound to `refresh_token`.
    async fn logout(&self, refresh_token: &RefreshToken) -> Result<(), IdentityProviderError>;

    /// Whether any identity is registered under `email`.
    async fn identity_exists_by_email(&self, email: &Email) -> Result<bool, IdentityProviderError>;

    /// Identities matching `filter`; empty when none match.
    async fn find_identities(
        &self,
        filter: &IdentityFilter,
    ) -> Result<Vec<Identity>, IdentityProviderError>;

    /// Trigger the email verification message.
    async fn send_verification_email(&self, auth_id: &AuthId) -> Result<(), IdentityProviderError>;

    /// Trigger the password reset message.
    async fn send_password_reset_email(
        &self,
        auth_id: &AuthId,
    ) -> Result<(), IdentityProviderError>;

    /// Verify a bearer token and return the identity it was issued to.
    async fn decode_token(&self, token: &BearerToken) -> Result<AuthId, IdentityProviderError>;
}
