//! PostgreSQL-backed `AccountRepository` implementation using Diesel ORM.
//!
//! Uniqueness of CVU, alias, auth id, and user id is enforced by named
//! constraints; violations surface as `AccountPersistenceError::Duplicate`.

use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::{exists, now};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{AccountPersistenceError, AccountRepository};
use crate::domain::{
    Account, AccountId, AccountSnapshot, AccountValidationError, Alias, AuthId, Cvu, NewAccount,
    Resource, User, UserChanges, UserId,
};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{AccountRow, NewAccountRow, NewUserRow, UserFieldsUpdate, UserRow};
use super::pool::DbPool;
use super::schema::{accounts, users};

/// Diesel-backed account and user repository.
#[derive(Clone)]
pub struct DieselAccountRepository {
    pool: DbPool,
}

impl DieselAccountRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_corrupt_row(err: AccountValidationError) -> AccountPersistenceError {
    AccountPersistenceError::query(format!("stored row violates invariant: {err}"))
}

fn to_account(row: AccountRow) -> Result<Account, AccountPersistenceError> {
    Account::try_from(row).map_err(map_corrupt_row)
}

fn to_user(row: UserRow) -> Result<User, AccountPersistenceError> {
    User::try_from(row).map_err(map_corrupt_row)
}

#[async_trait]
impl AccountRepository for DieselAccountRepository {
    async fn insert_user_and_account(
        &self,
        account: &NewAccount,
    ) -> Result<AccountSnapshot, AccountPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let (user_row, account_row) = conn
            .transaction(|conn| {
                async move {
                    let user_row: UserRow = diesel::insert_into(users::table)
                        .values(&NewUserRow {
                            dni: account.dni.get(),
                            phone: account.phone.get(),
                        })
                        .returning(UserRow::as_returning())
                        .get_result(conn)
                        .await?;

                    let account_row: AccountRow = diesel::insert_into(accounts::table)
                        .values(&NewAccountRow {
                            user_id: user_row.id,
                            auth_id: account.auth_id.as_str(),
                            cvu: account.cvu.as_str(),
                            alias: account.alias.as_str(),
                        })
                        .returning(AccountRow::as_returning())
                        .get_result(conn)
                        .await?;

                    Ok::<_, diesel::result::Error>((user_row, account_row))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        debug!(account_id = account_row.id, user_id = user_row.id, "account rows inserted");
        Ok(AccountSnapshot {
            account: to_account(account_row)?,
            user: to_user(user_row)?,
        })
    }

    async fn find_account_by_id(
        &self,
        id: AccountId,
    ) -> Result<Option<Account>, AccountPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = accounts::table
            .find(id.get())
            .select(AccountRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_account).transpose()
    }

    async fn find_account_by_user_id(
        &self,
        user_id: UserId,
    ) -> Result<Option<Account>, AccountPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = accounts::table
            .filter(accounts::user_id.eq(user_id.get()))
            .select(AccountRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_account).transpose()
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, AccountPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = users::table
            .find(id.get())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(to_user).transpose()
    }

    async fn cvu_exists(&self, cvu: &Cvu) -> Result<bool, AccountPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::select(exists(accounts::table.filter(accounts::cvu.eq(cvu.as_str()))))
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn alias_exists(&self, alias: &Alias) -> Result<bool, AccountPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::select(exists(
            accounts::table.filter(accounts::alias.eq(alias.as_str())),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn update_alias(
        &self,
        id: AccountId,
        alias: &Alias,
    ) -> Result<bool, AccountPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(accounts::table.find(id.get()))
            .set((
                accounts::alias.eq(alias.as_str()),
                accounts::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated == 1)
    }

    async fn owns_resource(
        &self,
        resource: Resource,
        auth_id: &AuthId,
    ) -> Result<bool, AccountPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let owned_by = accounts::auth_id.eq(auth_id.as_str());
        let query = match resource {
            Resource::Account(id) => diesel::select(exists(
                accounts::table
                    .filter(accounts::id.eq(id.get()))
                    .filter(owned_by),
            ))
            .get_result(&mut conn)
            .await,
            Resource::User(user_id) => diesel::select(exists(
                accounts::table
                    .filter(accounts::user_id.eq(user_id.get()))
                    .filter(owned_by),
            ))
            .get_result(&mut conn)
            .await,
        };
        query.map_err(map_diesel_error)
    }

    async fn update_user_fields(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<bool, AccountPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let update = UserFieldsUpdate {
            dni: changes.dni.map(|dni| dni.get()),
            phone: changes.phone.map(|phone| phone.get()),
            updated_at: Utc::now(),
        };
        let updated = diesel::update(users::table.find(id.get()))
            .set(&update)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated == 1)
    }
}
