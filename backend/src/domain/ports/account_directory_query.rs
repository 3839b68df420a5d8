//! Driving port for account and user reads.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{
    AccountId, Alias, Balance, Cvu, Dni, Email, Error, PersonName, PhoneNumber, UserId,
};

/// Account summary: identifiers and balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AccountInfo {
    pub account_id: AccountId,
    pub user_id: UserId,
    pub cvu: Cvu,
    pub alias: Alias,
    pub balance: Balance,
}

/// User profile combining identity fields with local user details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UserInfo {
    pub user_id: UserId,
    pub name: PersonName,
    pub last_name: PersonName,
    pub email: Email,
    pub dni: Dni,
    pub phone: PhoneNumber,
}

/// Domain use-case port for directory reads.
#[async_trait]
pub trait AccountDirectoryQuery: Send + Sync {
    /// Summary of the account with `account_id`.
    async fn account_info(&self, account_id: AccountId) -> Result<AccountInfo, Error>;

    /// Profile of the user with `user_id`.
    async fn user_info(&self, user_id: UserId) -> Result<UserInfo, Error>;
}
