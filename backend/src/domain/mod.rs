//! Domain primitives, services, and ports.
//!
//! Purpose: model accounts, users, and identities with validated types, and
//! orchestrate the identity provider and account store behind ports.
//!
//! Public surface:
//! - Error / ErrorCode — transport-agnostic failure taxonomy.
//! - Account, User, Cvu, Alias, AuthId — locally stored records.
//! - Identity and credential types — provider-held records and secrets.
//! - RegistrationService, AccountUpdateService, AuthorizationService,
//!   SessionService, AccountDirectoryService — driving port implementations.

pub mod account;
pub mod account_directory;
pub mod account_update;
pub mod authorization;
pub mod error;
mod failures;
pub mod identifiers;
pub mod identity;
pub mod ports;
pub mod registration;
pub mod session;

pub use self::account::{
    Account, AccountId, AccountSnapshot, AccountValidationError, Alias, AuthId, Balance, Cvu,
    Dni, NewAccount, PhoneNumber, Resource, User, UserChanges, UserId,
};
pub use self::account_directory::AccountDirectoryService;
pub use self::account_update::AccountUpdateService;
pub use self::authorization::AuthorizationService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::identifiers::{AliasWords, AliasWordsError, IdentifierGenerator};
pub use self::identity::{
    BearerToken, Email, Identity, IdentityChanges, IdentityFilter, IdentityValidationError,
    LoginCredentials, NewIdentity, Password, PersonName, RefreshToken, SessionTokens,
};
pub use self::registration::RegistrationService;
pub use self::session::SessionService;
