//! DTOs for the Keycloak admin REST and OpenID Connect payloads.
//!
//! User representations keep any attribute this adapter does not model in
//! `extra`, so a read-merge-write update never drops provider-side fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{
    AuthId, BearerToken, Email, Identity, IdentityChanges, NewIdentity, PersonName, RefreshToken,
    SessionTokens,
};

/// Required action Keycloak enforces before the first login.
pub(super) const VERIFY_EMAIL_ACTION: &str = "VERIFY_EMAIL";
/// Action requested by the password reset email.
pub(super) const UPDATE_PASSWORD_ACTION: &str = "UPDATE_PASSWORD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UserRepresentationDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(super) credentials: Vec<CredentialDto>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(super) required_actions: Vec<String>,
    #[serde(flatten)]
    pub(super) extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct CredentialDto {
    #[serde(rename = "type")]
    pub(super) kind: String,
    pub(super) value: String,
    pub(super) temporary: bool,
}

impl UserRepresentationDto {
    /// Representation for a new enabled, unverified identity whose username is
    /// its email.
    pub(super) fn for_registration(identity: &NewIdentity) -> Self {
        Self {
            username: Some(identity.email.as_str().to_owned()),
            first_name: Some(identity.first_name.as_str().to_owned()),
            last_name: Some(identity.last_name.as_str().to_owned()),
            email: Some(identity.email.as_str().to_owned()),
            email_verified: Some(false),
            enabled: Some(true),
            credentials: vec![CredentialDto {
                kind: "password".to_owned(),
                value: identity.password.expose().to_owned(),
                temporary: false,
            }],
            required_actions: vec![VERIFY_EMAIL_ACTION.to_owned()],
            ..Self::default()
        }
    }

    /// Overwrite the supplied fields. A new email also becomes the username.
    pub(super) fn merge(&mut self, changes: &IdentityChanges) {
        if let Some(first_name) = &changes.first_name {
            self.first_name = Some(first_name.as_str().to_owned());
        }
        if let Some(last_name) = &changes.last_name {
            self.last_name = Some(last_name.as_str().to_owned());
        }
        if let Some(email) = &changes.email {
            self.email = Some(email.as_str().to_owned());
            self.username = Some(email.as_str().to_owned());
        }
    }

    pub(super) fn into_identity(self) -> Result<Identity, String> {
        let id = self.id.ok_or("user representation has no id")?;
        let auth_id = AuthId::new(id.as_str()).map_err(|err| format!("user {id}: {err}"))?;
        let field = |value: Option<String>, name: &str| {
            value.ok_or_else(|| format!("user {id} has no {name}"))
        };
        let first_name = PersonName::new(field(self.first_name, "first name")?)
            .map_err(|err| format!("user {id}: {err}"))?;
        let last_name = PersonName::new(field(self.last_name, "last name")?)
            .map_err(|err| format!("user {id}: {err}"))?;
        let email =
            Email::new(field(self.email, "email")?).map_err(|err| format!("user {id}: {err}"))?;

        Ok(Identity {
            auth_id,
            first_name,
            last_name,
            email,
            email_verified: self.email_verified.unwrap_or(false),
            enabled: self.enabled.unwrap_or(false),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponseDto {
    pub(super) access_token: String,
    #[serde(default)]
    pub(super) refresh_token: Option<String>,
    #[serde(default)]
    pub(super) expires_in: u64,
}

impl TokenResponseDto {
    pub(super) fn into_session_tokens(self) -> Result<SessionTokens, String> {
        let refresh_token = self
            .refresh_token
            .ok_or("token response has no refresh token")?;
        Ok(SessionTokens {
            access_token: BearerToken::new(self.access_token)
                .map_err(|err| format!("access token: {err}"))?,
            refresh_token: RefreshToken::new(refresh_token)
                .map_err(|err| format!("refresh token: {err}"))?,
            expires_in_secs: self.expires_in,
        })
    }
}

/// OAuth 2.0 error body returned by the token and logout endpoints.
#[derive(Debug, Default, Deserialize)]
pub(super) struct OAuthErrorDto {
    #[serde(default)]
    pub(super) error: String,
    #[serde(default)]
    pub(super) error_description: Option<String>,
}

impl OAuthErrorDto {
    pub(super) fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub(super) fn is_invalid_grant(&self) -> bool {
        self.error == "invalid_grant"
    }

    /// Keycloak rejects logins with pending required actions this way.
    pub(super) fn is_account_not_set_up(&self) -> bool {
        self.is_invalid_grant()
            && self
                .error_description
                .as_deref()
                .is_some_and(|description| description.contains("not fully set up"))
    }
}
