//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **keycloak**: the identity provider over Keycloak's HTTP APIs
//! - **persistence**: PostgreSQL-backed account storage using Diesel ORM
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod keycloak;
pub mod persistence;
