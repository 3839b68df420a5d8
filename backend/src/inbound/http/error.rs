//! Status codes and JSON bodies for domain errors at the HTTP edge.
//!
//! Token failures carry an RFC 6750 `WWW-Authenticate` challenge and
//! exhausted identifier retries carry `Retry-After`, so clients can react
//! without parsing the body. Internal causes never reach the response.

use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, HttpResponseBuilder, ResponseError};
use tracing::{error, warn};

use crate::domain::{Error, ErrorCode};

/// Result alias for handlers and extractors.
pub type ApiResult<T> = Result<T, Error>;

/// Seconds a client should wait before retrying after `exhausted_retries`.
pub const RETRY_AFTER_SECS: u32 = 1;

const INTERNAL_MESSAGE: &str = "Internal server error";

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::InvalidCredentials
        | ErrorCode::EmailNotVerified
        | ErrorCode::TokenExpired
        | ErrorCode::InvalidToken => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::AccountNotFound | ErrorCode::UserNotExists => StatusCode::NOT_FOUND,
        ErrorCode::EmailAlreadyRegistered | ErrorCode::AliasAlreadyExists => StatusCode::CONFLICT,
        ErrorCode::ExhaustedRetries => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn bearer_challenge(code: ErrorCode) -> Option<&'static str> {
    match code {
        ErrorCode::TokenExpired => {
            Some(r#"Bearer error="invalid_token", error_description="token expired""#)
        }
        ErrorCode::InvalidToken => Some(r#"Bearer error="invalid_token""#),
        _ => None,
    }
}

fn client_body(error: &Error) -> Error {
    match error.code() {
        ErrorCode::InternalError => Error::internal(INTERNAL_MESSAGE),
        _ => error.clone(),
    }
}

fn add_headers(builder: &mut HttpResponseBuilder, code: ErrorCode) {
    if let Some(challenge) = bearer_challenge(code) {
        builder.insert_header((header::WWW_AUTHENTICATE, challenge));
    }
    if code == ErrorCode::ExhaustedRetries {
        builder.insert_header((header::RETRY_AFTER, RETRY_AFTER_SECS.to_string()));
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(status = status.as_u16(), code = ?self.code(), "request failed");
        }
        let mut builder = HttpResponse::build(status);
        add_headers(&mut builder, self.code());
        builder.json(client_body(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "actix error promoted to domain error");
        Self::internal(INTERNAL_MESSAGE)
    }
}
