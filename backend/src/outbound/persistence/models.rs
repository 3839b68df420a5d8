//! Internal Diesel row structs for database operations.
//!
//! These types never leave the persistence layer. Conversions into domain
//! types re-validate every column, so a row that violates a domain invariant
//! surfaces as a query error rather than a malformed domain value.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{
    Account, AccountId, AccountValidationError, Alias, AuthId, Balance, Cvu, Dni, PhoneNumber,
    User, UserId,
};

use super::schema::{accounts, users};

/// Row struct for reading from the users table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i64,
    pub dni: i64,
    pub phone: i64,
}

/// Insertable struct for creating user records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow {
    pub dni: i64,
    pub phone: i64,
}

/// Changeset for the mutable user columns; `None` columns are skipped.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserFieldsUpdate {
    pub dni: Option<i64>,
    pub phone: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Row struct for reading from the accounts table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AccountRow {
    pub id: i64,
    pub user_id: i64,
    pub auth_id: String,
    pub cvu: String,
    pub alias: String,
    pub balance_cents: i64,
}

/// Insertable struct for creating account records. The balance defaults to
/// zero in the schema.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub(crate) struct NewAccountRow<'a> {
    pub user_id: i64,
    pub auth_id: &'a str,
    pub cvu: &'a str,
    pub alias: &'a str,
}

impl TryFrom<UserRow> for User {
    type Error = AccountValidationError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(row.id)?,
            dni: Dni::new(row.dni)?,
            phone: PhoneNumber::new(row.phone)?,
        })
    }
}

impl TryFrom<AccountRow> for Account {
    type Error = AccountValidationError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AccountId::new(row.id)?,
            user_id: UserId::new(row.user_id)?,
            auth_id: AuthId::new(row.auth_id)?,
            cvu: Cvu::parse(row.cvu)?,
            alias: Alias::parse(row.alias)?,
            balance: Balance::from_cents(row.balance_cents)?,
        })
    }
}
