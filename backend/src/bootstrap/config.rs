//! Wallet configuration loaded via OrthoConfig.
//!
//! Every value can come from the command line, a config file, or a
//! `WALLET_`-prefixed environment variable. Required values are optional at
//! load time and checked when the typed adapter settings are derived, so a
//! missing value is reported by name. Tunables carry OrthoConfig defaults, so
//! loading with no input at all succeeds.

use std::fmt;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::outbound::keycloak::KeycloakSettings;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_ADMIN_REALM: &str = "master";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 30;

fn default_alias_words_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("alias-words.txt")
}

/// Errors raised while deriving adapter settings from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// A required value was not supplied.
    #[error("missing required setting {0}")]
    Missing(&'static str),
    /// A URL setting did not parse.
    #[error("setting {field} is not a valid URL: {message}")]
    InvalidUrl { field: &'static str, message: String },
    /// A retry bound was zero.
    #[error("setting {0} must be at least 1")]
    ZeroBound(&'static str),
}

/// Configuration values for the wallet account services.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "WALLET")]
pub struct WalletSettings {
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Seconds to wait for a pooled connection.
    pub db_connect_timeout_secs: Option<u64>,
    /// Keycloak server root URL.
    pub keycloak_url: Option<String>,
    /// Realm holding wallet identities.
    pub keycloak_realm: Option<String>,
    pub keycloak_client_id: Option<String>,
    pub keycloak_client_secret: Option<String>,
    /// Realm the admin user authenticates against. Defaults to `master`.
    pub keycloak_admin_realm: Option<String>,
    pub keycloak_admin_username: Option<String>,
    pub keycloak_admin_password: Option<String>,
    /// Per-request timeout for Keycloak calls, in seconds.
    pub http_timeout_secs: Option<u64>,
    /// Where the password reset email sends the user afterwards.
    pub password_reset_redirect_uri: Option<String>,
    /// Newline-separated alias word list.
    pub alias_words_path: Option<PathBuf>,
    /// Minimum seconds between signing key fetches for unknown key ids.
    #[ortho_config(default = 30)]
    pub signing_key_refresh_secs: u64,
    /// Candidates tried per CVU or alias before giving up.
    #[ortho_config(default = 10)]
    pub identifier_max_attempts: u32,
    /// Insert attempts per registration when generated values collide.
    #[ortho_config(default = 3)]
    pub registration_max_attempts: u32,
}

impl fmt::Debug for WalletSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "***");
        f.debug_struct("WalletSettings")
            .field("database_url", &redacted(&self.database_url))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_connect_timeout_secs", &self.db_connect_timeout_secs)
            .field("keycloak_url", &self.keycloak_url)
            .field("keycloak_realm", &self.keycloak_realm)
            .field("keycloak_client_id", &self.keycloak_client_id)
            .field("keycloak_client_secret", &redacted(&self.keycloak_client_secret))
            .field("keycloak_admin_realm", &self.keycloak_admin_realm)
            .field("keycloak_admin_username", &self.keycloak_admin_username)
            .field("keycloak_admin_password", &redacted(&self.keycloak_admin_password))
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("password_reset_redirect_uri", &self.password_reset_redirect_uri)
            .field("alias_words_path", &self.alias_words_path)
            .field("signing_key_refresh_secs", &self.signing_key_refresh_secs)
            .field("identifier_max_attempts", &self.identifier_max_attempts)
            .field("registration_max_attempts", &self.registration_max_attempts)
            .finish()
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, SettingsError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(SettingsError::Missing(name))
}

fn bound(value: u32, name: &'static str) -> Result<NonZeroU32, SettingsError> {
    NonZeroU32::new(value).ok_or(SettingsError::ZeroBound(name))
}

impl WalletSettings {
    /// Database URL, required.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        required(&self.database_url, "database_url")
    }

    /// Pool settings for the account store.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        Ok(PoolConfig::new(self.database_url()?)
            .with_max_size(self.db_max_connections.unwrap_or(DEFAULT_DB_MAX_CONNECTIONS))
            .with_connection_timeout(Duration::from_secs(
                self.db_connect_timeout_secs
                    .unwrap_or(DEFAULT_DB_CONNECT_TIMEOUT_SECS),
            )))
    }

    /// Settings for the Keycloak identity provider adapter.
    pub fn keycloak_settings(&self) -> Result<KeycloakSettings, SettingsError> {
        let raw_url = required(&self.keycloak_url, "keycloak_url")?;
        let base_url = Url::parse(raw_url).map_err(|err| SettingsError::InvalidUrl {
            field: "keycloak_url",
            message: err.to_string(),
        })?;
        let admin_realm = self
            .keycloak_admin_realm
            .as_deref()
            .unwrap_or(DEFAULT_ADMIN_REALM);

        let mut settings = KeycloakSettings::new(
            base_url,
            required(&self.keycloak_realm, "keycloak_realm")?,
            required(&self.keycloak_client_id, "keycloak_client_id")?,
            required(&self.keycloak_client_secret, "keycloak_client_secret")?,
        )
        .with_admin(
            admin_realm,
            required(&self.keycloak_admin_username, "keycloak_admin_username")?,
            required(&self.keycloak_admin_password, "keycloak_admin_password")?,
        )
        .with_timeout(Duration::from_secs(
            self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        ))
        .with_signing_key_refresh_interval(Duration::from_secs(self.signing_key_refresh_secs));
        if let Some(uri) = self.password_reset_redirect_uri.as_deref() {
            settings = settings.with_password_reset_redirect_uri(uri);
        }
        Ok(settings)
    }

    /// Return the configured alias word file, falling back to the bundled list.
    pub fn alias_words_path(&self) -> PathBuf {
        self.alias_words_path
            .clone()
            .unwrap_or_else(default_alias_words_path)
    }

    pub fn identifier_max_attempts(&self) -> Result<NonZeroU32, SettingsError> {
        bound(self.identifier_max_attempts, "identifier_max_attempts")
    }

    pub fn registration_max_attempts(&self) -> Result<NonZeroU32, SettingsError> {
        bound(self.registration_max_attempts, "registration_max_attempts")
    }
}
