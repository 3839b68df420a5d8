//! Driving port for account registration.
//!
//! Registration creates the remote identity, then the local user/account
//! pair with freshly generated CVU and alias values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AccountId, Alias, Cvu, Dni, Email, Error, Password, PersonName, PhoneNumber, UserId,
};

/// Raw registration fields as received from a transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegistrationPayload {
    pub name: String,
    pub last_name: String,
    pub dni: i64,
    pub phone: i64,
    pub email: String,
    pub password: String,
}

/// Validated registration input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub dni: Dni,
    pub phone: PhoneNumber,
    pub email: Email,
    pub password: Password,
}

pub(crate) fn invalid_field(field: &str, err: impl std::fmt::Display) -> Error {
    Error::invalid_request(format!("invalid {field}: {err}"))
}

impl TryFrom<RegistrationPayload> for RegistrationRequest {
    type Error = Error;

    fn try_from(value: RegistrationPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            first_name: PersonName::new(&value.name).map_err(|err| invalid_field("name", err))?,
            last_name: PersonName::new(&value.last_name)
                .map_err(|err| invalid_field("last name", err))?,
            dni: Dni::new(value.dni).map_err(|err| invalid_field("dni", err))?,
            phone: PhoneNumber::new(value.phone).map_err(|err| invalid_field("phone", err))?,
            email: Email::new(&value.email).map_err(|err| invalid_field("email", err))?,
            password: Password::new(&value.password)
                .map_err(|err| invalid_field("password", err))?,
        })
    }
}

/// Summary of a freshly registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RegisteredAccount {
    pub account_id: AccountId,
    pub user_id: UserId,
    pub name: PersonName,
    pub last_name: PersonName,
    pub email: Email,
    pub dni: Dni,
    pub phone: PhoneNumber,
    pub cvu: Cvu,
    pub alias: Alias,
}

/// Domain use-case port for registration.
#[async_trait]
pub trait RegistrationCommand: Send + Sync {
    /// Register a new identity and account.
    async fn register(&self, request: RegistrationRequest) -> Result<RegisteredAccount, Error>;
}
