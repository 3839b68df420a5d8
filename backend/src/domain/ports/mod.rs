//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod account_directory_query;
mod account_repository;
mod account_update_command;
mod authorization_query;
mod identity_provider;
mod registration_command;
mod session_command;

pub use account_directory_query::{AccountDirectoryQuery, AccountInfo, UserInfo};
#[cfg(test)]
pub use account_repository::MockAccountRepository;
pub use account_repository::{AccountPersistenceError, AccountRepository, UniqueField};
pub use account_update_command::{AccountChanges, AccountChangesPayload, AccountUpdateCommand};
#[cfg(test)]
pub use authorization_query::MockAuthorizationQuery;
pub use authorization_query::AuthorizationQuery;
#[cfg(test)]
pub use identity_provider::MockIdentityProvider;
pub use identity_provider::{IdentityProvider, IdentityProviderError};
pub use registration_command::{
    RegisteredAccount, RegistrationCommand, RegistrationPayload, RegistrationRequest,
};
pub use session_command::SessionCommand;
