//! Reqwest-backed Keycloak identity provider adapter.
//!
//! This adapter owns transport details only: admin authentication, request
//! serialisation, status mapping, and decoding into domain identities.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{OAuthErrorDto, TokenResponseDto, UPDATE_PASSWORD_ACTION, UserRepresentationDto};
use super::token::{SigningKeyCache, index_keys, realm_validation, token_key, verify_subject};
use crate::domain::ports::{IdentityProvider, IdentityProviderError};
use crate::domain::{
    AuthId, BearerToken, Email, Identity, IdentityChanges, IdentityFilter, LoginCredentials,
    NewIdentity, RefreshToken, SessionTokens,
};

const DEFAULT_ADMIN_CLIENT_ID: &str = "admin-cli";
const ADMIN_TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(10);
const DEFAULT_SIGNING_KEY_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Connection settings for one Keycloak realm.
#[derive(Clone)]
pub struct KeycloakSettings {
    /// Keycloak server root, e.g. `https://auth.example.com/`.
    pub base_url: Url,
    /// Realm holding wallet identities.
    pub realm: String,
    /// Confidential client used for logins and logouts.
    pub client_id: String,
    pub client_secret: Zeroizing<String>,
    /// Realm the admin user authenticates against.
    pub admin_realm: String,
    pub admin_client_id: String,
    pub admin_username: String,
    pub admin_password: Zeroizing<String>,
    /// Where the password reset flow returns the user.
    pub password_reset_redirect_uri: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Minimum spacing between JWKS fetches triggered by unknown key ids.
    pub signing_key_refresh_interval: Duration,
}

impl KeycloakSettings {
    /// Settings with the `admin-cli` admin client, no reset redirect, a ten
    /// second timeout, and signing keys refreshed at most every thirty seconds.
    pub fn new(
        base_url: Url,
        realm: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url,
            realm: realm.into(),
            client_id: client_id.into(),
            client_secret: Zeroizing::new(client_secret.into()),
            admin_realm: "master".to_owned(),
            admin_client_id: DEFAULT_ADMIN_CLIENT_ID.to_owned(),
            admin_username: String::new(),
            admin_password: Zeroizing::new(String::new()),
            password_reset_redirect_uri: None,
            timeout: Duration::from_secs(10),
            signing_key_refresh_interval: DEFAULT_SIGNING_KEY_REFRESH_INTERVAL,
        }
    }

    /// Set the admin realm and credentials.
    pub fn with_admin(
        mut self,
        realm: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.admin_realm = realm.into();
        self.admin_username = username.into();
        self.admin_password = Zeroizing::new(password.into());
        self
    }

    pub fn with_password_reset_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.password_reset_redirect_uri = Some(uri.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_signing_key_refresh_interval(mut self, interval: Duration) -> Self {
        self.signing_key_refresh_interval = interval;
        self
    }
}

impl std::fmt::Debug for KeycloakSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeycloakSettings")
            .field("base_url", &self.base_url.as_str())
            .field("realm", &self.realm)
            .field("client_id", &self.client_id)
            .field("admin_realm", &self.admin_realm)
            .field("admin_client_id", &self.admin_client_id)
            .field("admin_username", &self.admin_username)
            .field("timeout", &self.timeout)
            .field(
                "signing_key_refresh_interval",
                &self.signing_key_refresh_interval,
            )
            .finish_non_exhaustive()
    }
}

/// Errors raised while constructing the adapter.
#[derive(Debug, thiserror::Error)]
pub enum KeycloakSetupError {
    #[error("Keycloak base URL {0} cannot carry a path")]
    InvalidBaseUrl(String),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

struct CachedAdminToken {
    token: BearerToken,
    refresh_at: Instant,
}

/// Identity provider adapter for the Keycloak admin REST and OpenID Connect
/// APIs.
pub struct KeycloakIdentityProvider {
    client: Client,
    settings: KeycloakSettings,
    issuer: String,
    admin_token: Mutex<Option<CachedAdminToken>>,
    signing_keys: SigningKeyCache,
}

impl KeycloakIdentityProvider {
    /// Build an adapter using a reqwest client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL cannot be extended with paths or
    /// the reqwest client cannot be constructed.
    pub fn new(settings: KeycloakSettings) -> Result<Self, KeycloakSetupError> {
        if settings.base_url.cannot_be_a_base() {
            return Err(KeycloakSetupError::InvalidBaseUrl(
                settings.base_url.to_string(),
            ));
        }
        let client = Client::builder().timeout(settings.timeout).build()?;
        let issuer = endpoint(&settings.base_url, &["realms", &settings.realm])
            .map(|url| url.to_string())
            .unwrap_or_default();
        let signing_keys = SigningKeyCache::new(settings.signing_key_refresh_interval);
        Ok(Self {
            client,
            settings,
            issuer,
            admin_token: Mutex::new(None),
            signing_keys,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, IdentityProviderError> {
        endpoint(&self.settings.base_url, segments)
    }

    fn realm_url(&self, segments: &[&str]) -> Result<Url, IdentityProviderError> {
        let mut path = vec!["realms", self.settings.realm.as_str()];
        path.extend_from_slice(segments);
        self.url(&path)
    }

    fn admin_users_url(&self, segments: &[&str]) -> Result<Url, IdentityProviderError> {
        let mut path = vec!["admin", "realms", self.settings.realm.as_str(), "users"];
        path.extend_from_slice(segments);
        self.url(&path)
    }

    async fn admin_token(&self) -> Result<BearerToken, IdentityProviderError> {
        let mut cached = self.admin_token.lock().await;
        if let Some(entry) = cached.as_ref().filter(|entry| Instant::now() < entry.refresh_at) {
            return Ok(entry.token.clone());
        }

        let url = endpoint(
            &self.settings.base_url,
            &[
                "realms",
                &self.settings.admin_realm,
                "protocol",
                "openid-connect",
                "token",
            ],
        )?;
        let response = self
            .client
            .post(url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", self.settings.admin_client_id.as_str()),
                ("username", self.settings.admin_username.as_str()),
                ("password", self.settings.admin_password.as_str()),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;
        let (status, body) = read_body(response).await?;
        if !status.is_success() {
            return Err(IdentityProviderError::rejected(format!(
                "admin login failed: {}",
                status_message(status, &body)
            )));
        }

        let tokens: TokenResponseDto = decode_json(&body)?;
        let token = BearerToken::new(tokens.access_token)
            .map_err(|err| IdentityProviderError::rejected(format!("admin token: {err}")))?;
        let lifetime = Duration::from_secs(tokens.expires_in);
        *cached = Some(CachedAdminToken {
            token: token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(ADMIN_TOKEN_REFRESH_MARGIN),
        });
        Ok(token)
    }

    async fn send_admin(
        &self,
        request: RequestBuilder,
    ) -> Result<(StatusCode, Vec<u8>), IdentityProviderError> {
        let token = self.admin_token().await?;
        let response = request
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(map_transport_error)?;
        read_body(response).await
    }

    async fn fetch_user(
        &self,
        auth_id: &AuthId,
    ) -> Result<Option<UserRepresentationDto>, IdentityProviderError> {
        let url = self.admin_users_url(&[auth_id.as_str()])?;
        let (status, body) = self.send_admin(self.client.get(url)).await?;
        match status {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => decode_json(&body).map(Some),
            status => Err(map_status_error(status, &body)),
        }
    }

    async fn search_by_email(
        &self,
        email: &Email,
    ) -> Result<Vec<UserRepresentationDto>, IdentityProviderError> {
        let url = self.admin_users_url(&[])?;
        let request = self
            .client
            .get(url)
            .query(&[("email", email.as_str()), ("exact", "true")]);
        let (status, body) = self.send_admin(request).await?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        decode_json(&body)
    }

    async fn refresh_signing_keys(&self) -> Result<(), IdentityProviderError> {
        let url = self.realm_url(&["protocol", "openid-connect", "certs"])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let (status, body) = read_body(response).await?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        let keys = index_keys(&decode_json(&body)?);
        debug!(count = keys.len(), "realm signing keys refreshed");
        self.signing_keys.replace(keys).await;
        Ok(())
    }

    async fn signing_key(&self, kid: &str) -> Result<DecodingKey, IdentityProviderError> {
        if let Some(key) = self.signing_keys.get(kid).await {
            return Ok(key);
        }
        let unknown = || IdentityProviderError::invalid_token(format!("unknown signing key {kid}"));

        let Some(mut permit) = self.signing_keys.refresh_permit(Instant::now()).await else {
            debug!(kid, "signing key refresh throttled");
            return self.signing_keys.get(kid).await.ok_or_else(unknown);
        };
        if let Some(key) = self.signing_keys.get(kid).await {
            return Ok(key);
        }
        permit.mark_started(Instant::now());
        self.refresh_signing_keys().await?;
        drop(permit);
        self.signing_keys.get(kid).await.ok_or_else(unknown)
    }
}

#[async_trait]
impl IdentityProvider for KeycloakIdentityProvider {
    async fn register_identity(
        &self,
        identity: &NewIdentity,
    ) -> Result<AuthId, IdentityProviderError> {
        let url = self.admin_users_url(&[])?;
        let request = self
            .client
            .post(url)
            .json(&UserRepresentationDto::for_registration(identity));
        let token = self.admin_token().await?;
        let response = request
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(map_transport_error)?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let (status, body) = read_body(response).await?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }

        let location = location.ok_or_else(|| {
            IdentityProviderError::rejected("created user response has no Location header")
        })?;
        created_user_id(&location)
    }

    async fn update_identity(
        &self,
        auth_id: &AuthId,
        changes: &IdentityChanges,
    ) -> Result<(), IdentityProviderError> {
        let mut user = self
            .fetch_user(auth_id)
            .await?
            .ok_or_else(|| IdentityProviderError::not_found(auth_id.as_str()))?;
        user.merge(changes);

        let url = self.admin_users_url(&[auth_id.as_str()])?;
        let (status, body) = self.send_admin(self.client.put(url).json(&user)).await?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        Ok(())
    }

    async fn login_with_credentials(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<SessionTokens, IdentityProviderError> {
        let url = self.realm_url(&["protocol", "openid-connect", "token"])?;
        let response = self
            .client
            .post(url)
            .form(&[
                ("grant_type", "password"),
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("username", credentials.email().as_str()),
                ("password", credentials.password().expose()),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;
        let (status, body) = read_body(response).await?;

        match status {
            status if status.is_success() => {
                let tokens: TokenResponseDto = decode_json(&body)?;
                tokens
                    .into_session_tokens()
                    .map_err(IdentityProviderError::rejected)
            }
            StatusCode::UNAUTHORIZED => Err(IdentityProviderError::invalid_credentials()),
            StatusCode::BAD_REQUEST if OAuthErrorDto::parse(&body).is_account_not_set_up() => {
                Err(IdentityProviderError::email_not_verified())
            }
            status => Err(map_status_error(status, &body)),
        }
    }

    async fn logout(&self, refresh_token: &RefreshToken) -> Result<(), IdentityProviderError> {
        let url = self.realm_url(&["protocol", "openid-connect", "logout"])?;
        let response = self
            .client
            .post(url)
            .form(&[
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("refresh_token", refresh_token.expose()),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;
        let (status, body) = read_body(response).await?;

        match status {
            status if status.is_success() => Ok(()),
            StatusCode::BAD_REQUEST if OAuthErrorDto::parse(&body).is_invalid_grant() => Err(
                IdentityProviderError::invalid_token(status_message(status, &body)),
            ),
            status => Err(map_status_error(status, &body)),
        }
    }

    async fn identity_exists_by_email(&self, email: &Email) -> Result<bool, IdentityProviderError> {
        Ok(!self.search_by_email(email).await?.is_empty())
    }

    async fn find_identities(
        &self,
        filter: &IdentityFilter,
    ) -> Result<Vec<Identity>, IdentityProviderError> {
        let users: Vec<UserRepresentationDto> = match filter {
            IdentityFilter::ByAuthId(auth_id) => {
                self.fetch_user(auth_id).await?.into_iter().collect()
            }
            IdentityFilter::ByEmail(email) => self.search_by_email(email).await?,
        };
        users
            .into_iter()
            .map(|user| user.into_identity().map_err(IdentityProviderError::rejected))
            .collect()
    }

    async fn send_verification_email(&self, auth_id: &AuthId) -> Result<(), IdentityProviderError> {
        let url = self.admin_users_url(&[auth_id.as_str(), "send-verify-email"])?;
        let (status, body) = self.send_admin(self.client.put(url)).await?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        auth_id: &AuthId,
    ) -> Result<(), IdentityProviderError> {
        let url = self.admin_users_url(&[auth_id.as_str(), "execute-actions-email"])?;
        let mut request = self
            .client
            .put(url)
            .json(&[UPDATE_PASSWORD_ACTION])
            .query(&[("client_id", self.settings.client_id.as_str())]);
        if let Some(redirect) = &self.settings.password_reset_redirect_uri {
            request = request.query(&[("redirect_uri", redirect.as_str())]);
        }
        let (status, body) = self.send_admin(request).await?;
        if !status.is_success() {
            return Err(map_status_error(status, &body));
        }
        Ok(())
    }

    async fn decode_token(&self, token: &BearerToken) -> Result<AuthId, IdentityProviderError> {
        let raw = token.expose();
        let key_ref = token_key(raw)?;
        let key = self.signing_key(&key_ref.kid).await?;
        verify_subject(raw, &key, &realm_validation(key_ref.algorithm, &self.issuer))
    }
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, IdentityProviderError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| IdentityProviderError::rejected("Keycloak base URL cannot carry a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn created_user_id(location: &str) -> Result<AuthId, IdentityProviderError> {
    let id = location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    AuthId::new(id).map_err(|err| {
        IdentityProviderError::rejected(format!("Location header {location:?}: {err}"))
    })
}

async fn read_body(response: Response) -> Result<(StatusCode, Vec<u8>), IdentityProviderError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    Ok((status, body.to_vec()))
}

fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, IdentityProviderError> {
    serde_json::from_slice(body).map_err(|error| {
        IdentityProviderError::rejected(format!("invalid Keycloak JSON payload: {error}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> IdentityProviderError {
    if error.is_timeout() {
        IdentityProviderError::transport(format!("timed out: {error}"))
    } else {
        IdentityProviderError::transport(error.to_string())
    }
}

fn status_message(status: StatusCode, body: &[u8]) -> String {
    let body_preview = body_preview(body);
    if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> IdentityProviderError {
    let message = status_message(status, body);
    debug!(status = status.as_u16(), %message, "Keycloak request failed");
    match status {
        StatusCode::NOT_FOUND => IdentityProviderError::not_found(message),
        StatusCode::CONFLICT => IdentityProviderError::conflict(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            IdentityProviderError::transport(message)
        }
        _ if status.is_server_error() => IdentityProviderError::transport(message),
        _ => IdentityProviderError::rejected(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
