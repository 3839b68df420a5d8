//! Diesel and pool error mapping for the account repository.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::{AccountPersistenceError, UniqueField};

use super::pool::PoolError;

/// Unique constraint names declared by the accounts migration.
pub(crate) const ACCOUNTS_CVU_KEY: &str = "accounts_cvu_key";
pub(crate) const ACCOUNTS_ALIAS_KEY: &str = "accounts_alias_key";
pub(crate) const ACCOUNTS_AUTH_ID_KEY: &str = "accounts_auth_id_key";
pub(crate) const ACCOUNTS_USER_ID_KEY: &str = "accounts_user_id_key";

fn unique_field(constraint: &str) -> Option<UniqueField> {
    match constraint {
        ACCOUNTS_CVU_KEY => Some(UniqueField::Cvu),
        ACCOUNTS_ALIAS_KEY => Some(UniqueField::Alias),
        ACCOUNTS_AUTH_ID_KEY => Some(UniqueField::AuthId),
        ACCOUNTS_USER_ID_KEY => Some(UniqueField::UserId),
        _ => None,
    }
}

pub(crate) fn map_pool_error(error: PoolError) -> AccountPersistenceError {
    if error.is_timeout() {
        debug!("account store pool exhausted");
    }
    AccountPersistenceError::connection(error.into_message())
}

pub(crate) fn map_diesel_error(error: DieselError) -> AccountPersistenceError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        other => debug!(error = %other, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            match info.constraint_name().and_then(unique_field) {
                Some(field) => AccountPersistenceError::duplicate(field),
                None => AccountPersistenceError::query("unique constraint violated"),
            }
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            AccountPersistenceError::connection("database connection error")
        }
        DieselError::NotFound => AccountPersistenceError::query("record not found"),
        DieselError::QueryBuilderError(_) => AccountPersistenceError::query("database query error"),
        _ => AccountPersistenceError::query("database error"),
    }
}
