//! Wallet failure taxonomy shared by every service.
//!
//! Each [`Error`] carries one [`ErrorCode`] that callers branch on, a message
//! safe to show a client, and optional JSON details. Internal failures carry
//! a generic message only; their causes are logged where they happen.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Failure class; serialized as snake_case and stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// An input value failed validation.
    InvalidRequest,
    /// An identity already uses the supplied email.
    EmailAlreadyRegistered,
    /// Another account already claims the alias.
    AliasAlreadyExists,
    /// No account (or user) matches the supplied id.
    AccountNotFound,
    /// The email/password pair was rejected.
    InvalidCredentials,
    /// The identity exists but has not verified its email yet.
    EmailNotVerified,
    /// No identity is registered under the supplied email.
    UserNotExists,
    /// The bearer token has expired.
    TokenExpired,
    /// The bearer token is malformed or its signature does not verify.
    InvalidToken,
    /// Authenticated but not the owner of the addressed resource.
    Forbidden,
    /// A bounded generate-and-check loop ran out of attempts.
    ExhaustedRetries,
    /// An unexpected error occurred inside the domain or a collaborator.
    InternalError,
}

impl ErrorCode {
    /// Message used when a caller supplies a blank one.
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid request",
            Self::EmailAlreadyRegistered => "email already registered",
            Self::AliasAlreadyExists => "alias already exists",
            Self::AccountNotFound => "account not found",
            Self::InvalidCredentials => "invalid credentials",
            Self::EmailNotVerified => "email not verified",
            Self::UserNotExists => "user does not exist",
            Self::TokenExpired => "token expired",
            Self::InvalidToken => "invalid token",
            Self::Forbidden => "forbidden",
            Self::ExhaustedRetries => "exhausted retries",
            Self::InternalError => "internal error",
        }
    }
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` is non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use wallet::domain::{Error, ErrorCode};
///
/// let err = Error::account_not_found();
/// assert_eq!(err.code(), ErrorCode::AccountNotFound);
/// assert_eq!(err.message(), "account not found");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// Validation errors emitted by the fallible constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorValidationError {
    /// The message was empty after trimming.
    EmptyMessage,
}

impl std::fmt::Display for ErrorValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "error message must not be empty"),
        }
    }
}

impl std::error::Error for ErrorValidationError {}

impl Error {
    /// Create a new error. A blank message falls back to the code's default.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::try_new(code, message).unwrap_or_else(|_| Self::bare(code))
    }

    /// Like [`Self::new`] but rejects a blank message.
    pub fn try_new(code: ErrorCode, message: impl Into<String>) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            details: None,
        })
    }

    fn bare(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_owned(),
            details: None,
        }
    }

    /// Failure class.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Client-safe message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Structured context such as the offending field.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured context.
    ///
    /// # Examples
    /// ```
    /// use wallet::domain::Error;
    /// use serde_json::json;
    ///
    /// let err = Error::invalid_request("bad alias")
    ///     .with_details(json!({ "field": "alias" }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// [`ErrorCode::InvalidRequest`] naming what was wrong with the input.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// [`ErrorCode::Forbidden`]; the caller is authenticated but not the owner.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// [`ErrorCode::InternalError`] naming the failed operation, never its cause.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// [`ErrorCode::EmailAlreadyRegistered`] with its default message.
    pub fn email_already_registered() -> Self {
        Self::bare(ErrorCode::EmailAlreadyRegistered)
    }

    /// [`ErrorCode::AliasAlreadyExists`] with its default message.
    pub fn alias_already_exists() -> Self {
        Self::bare(ErrorCode::AliasAlreadyExists)
    }

    /// [`ErrorCode::AccountNotFound`] with its default message.
    pub fn account_not_found() -> Self {
        Self::bare(ErrorCode::AccountNotFound)
    }

    /// [`ErrorCode::InvalidCredentials`] with its default message.
    pub fn invalid_credentials() -> Self {
        Self::bare(ErrorCode::InvalidCredentials)
    }

    /// [`ErrorCode::EmailNotVerified`] with its default message.
    pub fn email_not_verified() -> Self {
        Self::bare(ErrorCode::EmailNotVerified)
    }

    /// [`ErrorCode::UserNotExists`] with its default message.
    pub fn user_not_exists() -> Self {
        Self::bare(ErrorCode::UserNotExists)
    }

    /// [`ErrorCode::TokenExpired`] with its default message.
    pub fn token_expired() -> Self {
        Self::bare(ErrorCode::TokenExpired)
    }

    /// [`ErrorCode::InvalidToken`] with its default message.
    pub fn invalid_token() -> Self {
        Self::bare(ErrorCode::InvalidToken)
    }

    /// [`ErrorCode::ExhaustedRetries`] with its default message.
    pub fn exhausted_retries() -> Self {
        Self::bare(ErrorCode::ExhaustedRetries)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            details,
        } = value;

        let mut error = Error::try_new(code, message)?;
        error.details = details;
        Ok(error)
    }
}
