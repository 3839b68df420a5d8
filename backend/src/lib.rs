//! Wallet account provisioning and authorization.
//!
//! Accounts pair an identity held by Keycloak with a locally stored user and
//! account record. The [`domain`] module holds the services for registration,
//! account updates, alias changes, sessions, and ownership checks behind port
//! traits. [`outbound`] implements those ports over Keycloak and PostgreSQL,
//! [`inbound`] maps domain errors and ownership checks onto HTTP, and
//! [`bootstrap`] wires everything from configuration.

pub mod bootstrap;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod telemetry;
