//! Keycloak outbound adapter.
//!
//! This module provides a thin HTTP implementation of the `IdentityProvider`
//! port over the Keycloak admin REST and OpenID Connect endpoints.

mod dto;
mod http_identity_provider;
mod token;

pub use http_identity_provider::{KeycloakIdentityProvider, KeycloakSettings, KeycloakSetupError};
