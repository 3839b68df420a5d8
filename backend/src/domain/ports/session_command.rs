//! Driving port for identity sessions: login, logout, and password reset.

use async_trait::async_trait;

use crate::domain::{Email, Error, LoginCredentials, RefreshToken, SessionTokens};

/// Domain use-case port for sessions.
#[async_trait]
pub trait SessionCommand: Send + Sync {
    /// Exchange credentials for session tokens.
    async fn login(&self, credentials: &LoginCredentials) -> Result<SessionTokens, Error>;

    /// End the session bound to `refresh_token`.
    async fn logout(&self, refresh_token: &RefreshToken) -> Result<(), Error>;

    /// Send the password reset email to the identity registered under
    /// `email`.
    async fn request_password_reset(&self, email: &Email) -> Result<(), Error>;
}
