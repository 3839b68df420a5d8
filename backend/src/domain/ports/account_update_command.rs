//! Driving port for account and alias updates.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{
    AccountId, AccountSnapshot, Alias, Dni, Email, Error, IdentityChanges, PersonName,
    PhoneNumber, UserChanges,
};

use super::registration_command::invalid_field;

/// Raw partial-update fields as received from a transport.
///
/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AccountChangesPayload {
    pub name: Option<String>,
    pub last_name: Option<String>,
    pub dni: Option<i64>,
    pub phone: Option<i64>,
    pub email: Option<String>,
}

/// Validated partial update of an account's identity and user details.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    pub first_name: Option<PersonName>,
    pub last_name: Option<PersonName>,
    pub dni: Option<Dni>,
    pub phone: Option<PhoneNumber>,
    pub email: Option<Email>,
}

impl AccountChanges {
    /// Fields held by the identity provider.
    pub fn identity_changes(&self) -> IdentityChanges {
        IdentityChanges {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }

    /// Fields held in the local user row.
    pub const fn user_changes(&self) -> UserChanges {
        UserChanges {
            dni: self.dni,
            phone: self.phone,
        }
    }
}

impl TryFrom<AccountChangesPayload> for AccountChanges {
    type Error = Error;

    fn try_from(value: AccountChangesPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            first_name: value
                .name
                .map(PersonName::new)
                .transpose()
                .map_err(|err| invalid_field("name", err))?,
            last_name: value
                .last_name
                .map(PersonName::new)
                .transpose()
                .map_err(|err| invalid_field("last name", err))?,
            dni: value
                .dni
                .map(Dni::new)
                .transpose()
                .map_err(|err| invalid_field("dni", err))?,
            phone: value
                .phone
                .map(PhoneNumber::new)
                .transpose()
                .map_err(|err| invalid_field("phone", err))?,
            email: value
                .email
                .map(Email::new)
                .transpose()
                .map_err(|err| invalid_field("email", err))?,
        })
    }
}

/// Domain use-case port for post-registration changes.
#[async_trait]
pub trait AccountUpdateCommand: Send + Sync {
    /// Apply `changes` to the account and return the stored snapshot.
    async fn update_account(
        &self,
        account_id: AccountId,
        changes: AccountChanges,
    ) -> Result<AccountSnapshot, Error>;

    /// Replace the account's alias with `alias`.
    async fn change_alias(&self, account_id: AccountId, alias: Alias) -> Result<(), Error>;
}
