//! Account and user data model.
//!
//! An [`Account`] links one locally stored [`User`] to an identity held by
//! the identity provider through its [`AuthId`]. Accounts carry two unique
//! human-facing identifiers: a 22-digit [`Cvu`] and a three word [`Alias`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of digits in a CVU.
pub const CVU_LENGTH: usize = 22;

/// Number of words in an alias.
pub const ALIAS_WORD_COUNT: usize = 3;

/// Separator between alias words.
pub const ALIAS_SEPARATOR: char = '.';

/// Validation errors returned by the constructors in this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountValidationError {
    /// A store identifier was zero or negative.
    NonPositiveId { field: &'static str },
    /// A CVU did not consist of exactly 22 ASCII digits.
    InvalidCvu,
    /// An alias did not consist of three dot-separated words.
    InvalidAlias,
    /// The identity provider key was blank.
    EmptyAuthId,
    /// A DNI was zero or negative.
    InvalidDni,
    /// A phone number was zero or negative.
    InvalidPhone,
    /// A balance was negative.
    NegativeBalance,
}

impl fmt::Display for AccountValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveId { field } => write!(f, "{field} must be a positive integer"),
            Self::InvalidCvu => write!(f, "cvu must be exactly {CVU_LENGTH} digits"),
            Self::InvalidAlias => write!(
                f,
                "alias must be {ALIAS_WORD_COUNT} non-empty words separated by '{ALIAS_SEPARATOR}'"
            ),
            Self::EmptyAuthId => write!(f, "auth id must not be empty"),
            Self::InvalidDni => write!(f, "dni must be a positive integer"),
            Self::InvalidPhone => write!(f, "phone must be a positive integer"),
            Self::NegativeBalance => write!(f, "balance must not be negative"),
        }
    }
}

impl std::error::Error for AccountValidationError {}

macro_rules! positive_id {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Validate and wrap a store-assigned identifier.
            pub fn new(value: i64) -> Result<Self, AccountValidationError> {
                if value <= 0 {
                    return Err(AccountValidationError::NonPositiveId { field: $field });
                }
                Ok(Self(value))
            }

            /// Raw integer value.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = AccountValidationError;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

positive_id!(
    /// Store-assigned account identifier.
    AccountId,
    "account id"
);

positive_id!(
    /// Store-assigned user identifier.
    UserId,
    "user id"
);

/// National identity document number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Dni(i64);

impl Dni {
    /// Validate a DNI; it must be positive.
    pub fn new(value: i64) -> Result<Self, AccountValidationError> {
        if value <= 0 {
            return Err(AccountValidationError::InvalidDni);
        }
        Ok(Self(value))
    }

    /// Raw integer value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Dni {
    type Error = AccountValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Dni> for i64 {
    fn from(value: Dni) -> Self {
        value.0
    }
}

/// Contact phone number stored as digits only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct PhoneNumber(i64);

impl PhoneNumber {
    /// Validate a phone number; it must be positive.
    pub fn new(value: i64) -> Result<Self, AccountValidationError> {
        if value <= 0 {
            return Err(AccountValidationError::InvalidPhone);
        }
        Ok(Self(value))
    }

    /// Raw integer value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for PhoneNumber {
    type Error = AccountValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PhoneNumber> for i64 {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

/// Uniform virtual key: a 22-digit numeric routing code.
///
/// # Examples
/// ```
/// use wallet::domain::Cvu;
///
/// let cvu = Cvu::parse("0000003100010000000001").unwrap();
/// assert_eq!(cvu.as_str().len(), 22);
/// assert!(Cvu::parse("12345").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cvu(String);

impl Cvu {
    /// Validate a CVU string.
    pub fn parse(value: impl Into<String>) -> Result<Self, AccountValidationError> {
        let value = value.into();
        if value.len() != CVU_LENGTH || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AccountValidationError::InvalidCvu);
        }
        Ok(Self(value))
    }

    /// Borrow the digits.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Cvu {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Cvu> for String {
    fn from(value: Cvu) -> Self {
        value.0
    }
}

impl fmt::Display for Cvu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns true when `word` may appear as one component of an alias.
pub fn is_alias_word(word: &str) -> bool {
    !word.is_empty() && word.chars().all(char::is_alphanumeric)
}

/// Human-friendly account alias made of three words joined by `.`.
///
/// # Examples
/// ```
/// use wallet::domain::Alias;
///
/// let alias = Alias::parse("sol.luna.mar").unwrap();
/// assert_eq!(alias.words().collect::<Vec<_>>(), ["sol", "luna", "mar"]);
/// assert!(Alias::parse("sol..mar").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Alias(String);

impl Alias {
    /// Validate an alias string.
    pub fn parse(value: impl Into<String>) -> Result<Self, AccountValidationError> {
        let value = value.into();
        let mut count = 0_usize;
        for word in value.split(ALIAS_SEPARATOR) {
            if !is_alias_word(word) {
                return Err(AccountValidationError::InvalidAlias);
            }
            count += 1;
        }
        if count != ALIAS_WORD_COUNT {
            return Err(AccountValidationError::InvalidAlias);
        }
        Ok(Self(value))
    }

    /// Join already validated words into an alias.
    pub fn from_words<'a>(
        words: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, AccountValidationError> {
        let joined = words
            .into_iter()
            .collect::<Vec<_>>()
            .join(&ALIAS_SEPARATOR.to_string());
        Self::parse(joined)
    }

    /// Borrow the alias text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Iterate over the alias words.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.0.split(ALIAS_SEPARATOR)
    }
}

impl TryFrom<String> for Alias {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Alias> for String {
    fn from(value: Alias) -> Self {
        value.0
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identity provider key correlating an account with its identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AuthId(String);

impl AuthId {
    /// Validate an identity provider key.
    pub fn new(value: impl Into<String>) -> Result<Self, AccountValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AccountValidationError::EmptyAuthId);
        }
        Ok(Self(value))
    }

    /// Borrow the key.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for AuthId {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AuthId> for String {
    fn from(value: AuthId) -> Self {
        value.0
    }
}

impl fmt::Display for AuthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-negative account balance held in minor units (cents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Balance(i64);

impl Balance {
    /// Balance of a freshly registered account.
    pub const ZERO: Self = Self(0);

    /// Validate a balance expressed in cents.
    pub fn from_cents(cents: i64) -> Result<Self, AccountValidationError> {
        if cents < 0 {
            return Err(AccountValidationError::NegativeBalance);
        }
        Ok(Self(cents))
    }

    /// Balance in cents.
    pub const fn cents(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Balance {
    type Error = AccountValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_cents(value)
    }
}

impl From<Balance> for i64 {
    fn from(value: Balance) -> Self {
        value.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Locally stored user details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub dni: Dni,
    pub phone: PhoneNumber,
}

/// Locally stored account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    pub auth_id: AuthId,
    pub cvu: Cvu,
    pub alias: Alias,
    pub balance: Balance,
}

/// An account together with its owning user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account: Account,
    pub user: User,
}

/// Values inserted for a new user/account pair in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub auth_id: AuthId,
    pub dni: Dni,
    pub phone: PhoneNumber,
    pub cvu: Cvu,
    pub alias: Alias,
}

/// Local user columns that may change after registration.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub dni: Option<Dni>,
    pub phone: Option<PhoneNumber>,
}

impl UserChanges {
    /// True when no column would change.
    pub const fn is_empty(&self) -> bool {
        self.dni.is_none() && self.phone.is_none()
    }
}

/// A resource addressed by an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Matched against the account id.
    Account(AccountId),
    /// Matched against the owning user id.
    User(UserId),
}
