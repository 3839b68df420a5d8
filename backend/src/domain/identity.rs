//! Identity provider records and credential primitives.
//!
//! Identities live in the remote identity provider; this module only models
//! what the domain reads from and writes to it. Secrets are wrapped in
//! [`Zeroizing`] and never appear in `Debug` output.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::account::AuthId;

/// Validation errors for identity inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityValidationError {
    /// A name was blank once trimmed.
    EmptyName,
    /// The email was blank or not shaped like `local@domain`.
    InvalidEmail,
    /// The password was empty.
    EmptyPassword,
    /// A token was blank.
    EmptyToken,
}

impl fmt::Display for IdentityValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::InvalidEmail => write!(f, "email must look like local@domain"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
            Self::EmptyToken => write!(f, "token must not be empty"),
        }
    }
}

impl std::error::Error for IdentityValidationError {}

/// First or last name of a person, trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonName(String);

impl PersonName {
    /// Validate and trim a name.
    pub fn new(value: impl AsRef<str>) -> Result<Self, IdentityValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IdentityValidationError::EmptyName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for PersonName {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PersonName> for String {
    fn from(value: PersonName) -> Self {
        value.0
    }
}

/// Email address used both as contact and as the provider username.
///
/// Only the `local@domain` shape is checked; deliverability is the
/// provider's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and trim an email address.
    pub fn new(value: impl AsRef<str>) -> Result<Self, IdentityValidationError> {
        let trimmed = value.as_ref().trim();
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(IdentityValidationError::InvalidEmail);
        };
        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(IdentityValidationError::InvalidEmail);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the address.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Email {
    type Error = IdentityValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied password, zeroed on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Accept any non-empty password, preserving whitespace.
    pub fn new(value: &str) -> Result<Self, IdentityValidationError> {
        if value.is_empty() {
            return Err(IdentityValidationError::EmptyPassword);
        }
        Ok(Self(Zeroizing::new(value.to_owned())))
    }

    /// Expose the secret for a provider call.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

macro_rules! secret_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(Zeroizing<String>);

        impl $name {
            /// Accept a non-blank token.
            pub fn new(value: impl Into<String>) -> Result<Self, IdentityValidationError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(IdentityValidationError::EmptyToken);
                }
                Ok(Self(Zeroizing::new(value)))
            }

            /// Expose the raw token.
            pub fn expose(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(***)"))
            }
        }
    };
}

secret_token!(
    /// Signed access token presented as `Authorization: Bearer <token>`.
    BearerToken
);

secret_token!(
    /// Refresh token used to end a provider session.
    RefreshToken
);

/// Identity as held by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub auth_id: AuthId,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub email: Email,
    pub email_verified: bool,
    pub enabled: bool,
}

/// Values for a new identity. The provider stores it enabled and unverified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub email: Email,
    pub password: Password,
}

/// Identity fields to change; `None` leaves the provider value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityChanges {
    pub first_name: Option<PersonName>,
    pub last_name: Option<PersonName>,
    pub email: Option<Email>,
}

impl IdentityChanges {
    /// True when no field would change.
    pub const fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.email.is_none()
    }
}

/// Lookup key for identity searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityFilter {
    /// Match the provider key exactly.
    ByAuthId(AuthId),
    /// Match the email exactly.
    ByEmail(Email),
}

/// Validated login credentials.
///
/// # Examples
/// ```
/// use wallet::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" ana@example.com ", "pw").unwrap();
/// assert_eq!(creds.email().as_str(), "ana@example.com");
/// assert_eq!(creds.password().expose(), "pw");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: Email,
    password: Password,
}

impl LoginCredentials {
    /// Construct credentials from raw email/password inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, IdentityValidationError> {
        Ok(Self {
            email: Email::new(email)?,
            password: Password::new(password)?,
        })
    }

    /// Email the identity is registered under.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Password provided by the caller.
    pub fn password(&self) -> &Password {
        &self.password
    }
}

/// Tokens issued by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: BearerToken,
    pub refresh_token: RefreshToken,
    pub expires_in_secs: u64,
}
