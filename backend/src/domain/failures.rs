//! Collapse driven-port failures into internal domain errors.
//!
//! The cause is logged at the call site's dispatcher; the returned error only
//! names the failed operation.

use tracing::error;

use super::Error;
use super::ports::{AccountPersistenceError, IdentityProviderError};

pub(crate) fn store_failure(operation: &'static str, err: AccountPersistenceError) -> Error {
    error!(operation, kind = err.kind(), error = %err, "account store failure");
    Error::internal(format!("{operation} failed"))
}

pub(crate) fn identity_failure(operation: &'static str, err: IdentityProviderError) -> Error {
    error!(operation, kind = err.kind(), error = %err, "identity provider failure");
    Error::internal(format!("{operation} failed"))
}
