//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repository implementations only translate between Diesel rows and domain
//! types. Row structs (`models.rs`) and table definitions (`schema.rs`) stay
//! private to this module; every database failure is mapped to
//! `AccountPersistenceError` before it reaches the domain.
//!
//! # Example
//!
//! ```ignore
//! use wallet::outbound::persistence::{DbPool, DieselAccountRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/wallet")).await?;
//! let repo = DieselAccountRepository::new(pool);
//! ```

mod diesel_account_repository;
mod diesel_error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_account_repository::DieselAccountRepository;
pub use migrations::{
    MIGRATIONS, MigrationError, run_pending_migrations, run_pending_migrations_blocking,
};
pub use pool::{DbPool, PoolConfig, PoolError};
