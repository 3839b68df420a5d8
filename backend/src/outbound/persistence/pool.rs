//! bb8 pool of `diesel-async` PostgreSQL connections for the account store.
//!
//! The checkout timeout is the deadline for every repository call that needs
//! a connection; an exhausted pool surfaces as [`PoolError::Checkout`] with
//! `timed_out` set rather than blocking the request.

use std::fmt;
use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection, RunError};
use tracing::debug;
use url::Url;

const DEFAULT_MAX_SIZE: u32 = 10;
const DEFAULT_MIN_IDLE: u32 = 2;
const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures building the pool or checking a connection out of it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// No connection could be handed out.
    #[error("account store connection unavailable: {message}")]
    Checkout { message: String, timed_out: bool },

    /// The pool configuration was rejected.
    #[error("account store pool not built: {message}")]
    Build { message: String },
}

impl PoolError {
    /// Checkout failure that was not a timeout.
    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
            timed_out: false,
        }
    }

    /// Configuration or startup failure.
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    /// True when checkout gave up after the configured timeout.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Checkout { timed_out: true, .. })
    }

    /// Message without the variant prefix.
    pub fn into_message(self) -> String {
        match self {
            Self::Checkout { message, .. } | Self::Build { message } => message,
        }
    }
}

impl From<RunError> for PoolError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::TimedOut => Self::Checkout {
                message: "timed out waiting for a connection".to_owned(),
                timed_out: true,
            },
            RunError::User(inner) => Self::checkout(inner.to_string()),
        }
    }
}

/// Sizing and deadline settings for [`DbPool`].
///
/// `Debug` output masks any password embedded in the database URL.
#[derive(Clone)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    min_idle: Option<u32>,
    connection_timeout: Duration,
}

impl PoolConfig {
    /// Ten connections, two kept idle, thirty second checkout timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: DEFAULT_MAX_SIZE,
            min_idle: Some(DEFAULT_MIN_IDLE),
            connection_timeout: DEFAULT_CHECKOUT_TIMEOUT,
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// `None` lets bb8 drop every idle connection.
    pub fn with_min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Connection string, including credentials.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    fn validate(&self) -> Result<(), PoolError> {
        if self.max_size == 0 {
            return Err(PoolError::build("max size must be at least 1"));
        }
        match self.min_idle {
            Some(min_idle) if min_idle > self.max_size => Err(PoolError::build(format!(
                "min idle {min_idle} exceeds max size {}",
                self.max_size
            ))),
            _ => Ok(()),
        }
    }
}

fn redacted_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("***")).is_err() {
                return "<unprintable>".to_owned();
            }
            url.to_string()
        }
        Err(_) => "<unparseable>".to_owned(),
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("database_url", &redacted_url(&self.database_url))
            .field("max_size", &self.max_size)
            .field("min_idle", &self.min_idle)
            .field("connection_timeout", &self.connection_timeout)
            .finish()
    }
}

/// Shared handle to the connection pool; clones share connections.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Build the pool. Connections are opened lazily up to `min_idle`, so an
    /// unreachable database is reported on first checkout rather than here.
    ///
    /// # Errors
    ///
    /// [`PoolError::Build`] when the sizing is invalid or bb8 refuses it.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
        let inner = Pool::builder()
            .max_size(config.max_size)
            .min_idle(config.min_idle)
            .connection_timeout(config.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        debug!(
            max_size = config.max_size,
            checkout_timeout_ms = config.connection_timeout.as_millis(),
            "account store pool ready"
        );
        Ok(Self { inner })
    }

    /// Check a connection out, waiting at most the configured timeout.
    ///
    /// # Errors
    ///
    /// [`PoolError::Checkout`]; `is_timeout` tells a saturated pool apart
    /// from a failed connection attempt.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner.get().await.map_err(PoolError::from)
    }
}
