//! Port abstraction for account persistence adapters and their errors.

use std::fmt;

use async_trait::async_trait;

use crate::domain::{
    Account, AccountId, AccountSnapshot, Alias, AuthId, Cvu, NewAccount, Resource, User,
    UserChanges, UserId,
};

use super::define_port_error;

/// Account columns guarded by a unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueField {
    Cvu,
    Alias,
    AuthId,
    UserId,
}

impl UniqueField {
    /// True for columns whose values are generated at registration and can
    /// be regenerated after a collision.
    pub const fn is_generated(self) -> bool {
        matches!(self, Self::Cvu | Self::Alias)
    }
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cvu => "cvu",
            Self::Alias => "alias",
            Self::AuthId => "auth_id",
            Self::UserId => "user_id",
        })
    }
}

define_port_error! {
    /// Persistence errors raised by account repository adapters.
    pub enum AccountPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "account repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "account repository query failed: {message}",
        /// A write collided with an existing row on a unique column.
        Duplicate { field: UniqueField } => "account {field} already exists",
    }
}

/// Port for users and accounts stored locally.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert the user row and then the account row in one transaction.
    ///
    /// Either both rows exist afterwards or neither does.
    async fn insert_user_and_account(
        &self,
        account: &NewAccount,
    ) -> Result<AccountSnapshot, AccountPersistenceError>;

    /// Fetch an account by identifier.
    async fn find_account_by_id(
        &self,
        id: AccountId,
    ) -> Result<Option<Account>, AccountPersistenceError>;

    /// Fetch the account owned by a user.
    async fn find_account_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<Account>, AccountPersistenceError>;

    /// Fetch a user by identifier.
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, AccountPersistenceError>;

    /// Whether any account already uses `cvu`.
    async fn cvu_exists(&self, cvu: &Cvu) -> Result<bool, AccountPersistenceError>;

    /// Whether any account already uses `alias`.
    async fn alias_exists(&self, alias: &Alias) -> Result<bool, AccountPersistenceError>;

    /// Replace an account's alias. Returns false when no row matched.
    async fn update_alias(
        &self,
        id: AccountId,
        alias: &Alias,
    ) -> Result<bool, AccountPersistenceError>;

    /// Whether an account matching `resource` belongs to `auth_id`.
    async fn owns_resource(
        &self,
        resource: Resource,
        auth_id: &AuthId,
    ) -> Result<bool, AccountPersistenceError>;

    /// Apply the supplied columns to a user row. Returns false when no row
    /// matched.
    async fn update_user_fields(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<bool, AccountPersistenceError>;
}
