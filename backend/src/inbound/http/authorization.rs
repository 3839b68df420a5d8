//! Ownership checks for HTTP handlers.
//!
//! Handlers addressing an account or user take [`OwnedResource`] as an
//! extractor. It reads the bearer token and the `account_id` or `user_id`
//! path parameter, then asks the [`AuthorizationQuery`] registered as app
//! data whether the caller owns the resource.

use std::future::Future;
use std::pin::Pin;

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};

use crate::domain::ports::AuthorizationQuery;
use crate::domain::{AccountId, BearerToken, Error, Resource, UserId};

use super::ApiResult;

/// Path parameter naming an account.
pub const ACCOUNT_ID_PARAM: &str = "account_id";
/// Path parameter naming a user.
pub const USER_ID_PARAM: &str = "user_id";

const BEARER_SCHEME: &str = "bearer";

/// Read the `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &HttpRequest) -> ApiResult<BearerToken> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(Error::invalid_token)?
        .to_str()
        .map_err(|_| Error::invalid_token())?;
    let (scheme, token) = header.split_once(' ').ok_or_else(Error::invalid_token)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(Error::invalid_token());
    }
    BearerToken::new(token.trim()).map_err(|_| Error::invalid_token())
}

/// Resource addressed by the matched route.
pub fn path_resource(req: &HttpRequest) -> ApiResult<Resource> {
    let match_info = req.match_info();
    if let Some(raw) = match_info.get(ACCOUNT_ID_PARAM) {
        return parse_id(ACCOUNT_ID_PARAM, raw)
            .and_then(|id| AccountId::new(id).map_err(|err| invalid_path(ACCOUNT_ID_PARAM, err)))
            .map(Resource::Account);
    }
    if let Some(raw) = match_info.get(USER_ID_PARAM) {
        return parse_id(USER_ID_PARAM, raw)
            .and_then(|id| UserId::new(id).map_err(|err| invalid_path(USER_ID_PARAM, err)))
            .map(Resource::User);
    }
    Err(Error::invalid_request(
        "route does not address an account or user",
    ))
}

fn parse_id(param: &str, raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>().map_err(|err| invalid_path(param, err))
}

fn invalid_path(param: &str, err: impl std::fmt::Display) -> Error {
    Error::invalid_request(format!("{param}: {err}"))
        .with_details(serde_json::json!({ "field": param }))
}

/// Fail with `Forbidden` unless the bearer of the request owns the resource
/// its path addresses.
pub async fn require_ownership(
    query: &dyn AuthorizationQuery,
    req: &HttpRequest,
) -> ApiResult<Resource> {
    let token = bearer_token(req)?;
    let resource = path_resource(req)?;
    if query.is_authorized(resource, &token).await? {
        Ok(resource)
    } else {
        Err(Error::forbidden("caller does not own this resource"))
    }
}

/// Extractor proving the caller owns the addressed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedResource(pub Resource);

impl FromRequest for OwnedResource {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let query = req
                .app_data::<web::Data<dyn AuthorizationQuery>>()
                .cloned()
                .ok_or_else(|| Error::internal("authorization query is not registered"))?;
            require_ownership(query.get_ref(), &req).await.map(Self)
        })
    }
}
