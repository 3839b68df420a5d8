//! Wiring of adapters and domain services from configuration.

use std::num::NonZeroU32;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use super::alias_words::{AliasWordsLoadError, load_alias_words};
use super::config::{SettingsError, WalletSettings};
use crate::domain::ports::{
    AccountDirectoryQuery, AccountRepository, AccountUpdateCommand, AuthorizationQuery,
    IdentityProvider, RegistrationCommand, SessionCommand,
};
use crate::domain::{
    AccountDirectoryService, AccountUpdateService, AliasWords, AuthorizationService,
    IdentifierGenerator, RegistrationService, SessionService,
};
use crate::outbound::keycloak::{KeycloakIdentityProvider, KeycloakSetupError};
use crate::outbound::persistence::{
    DbPool, DieselAccountRepository, MigrationError, PoolError, run_pending_migrations,
};
use crate::telemetry::Telemetry;

/// Errors raised while building the service graph.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    AliasWords(#[from] AliasWordsLoadError),
    #[error(transparent)]
    Migrations(#[from] MigrationError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Keycloak(#[from] KeycloakSetupError),
}

/// Driving ports ready to be handed to inbound adapters.
#[derive(Clone)]
pub struct WalletServices {
    pub registration: Arc<dyn RegistrationCommand>,
    pub account_update: Arc<dyn AccountUpdateCommand>,
    pub authorization: Arc<dyn AuthorizationQuery>,
    pub session: Arc<dyn SessionCommand>,
    pub directory: Arc<dyn AccountDirectoryQuery>,
}

/// Retry bounds shared by the generation and registration loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBounds {
    pub identifier_attempts: NonZeroU32,
    pub registration_attempts: NonZeroU32,
}

/// Build every service over the given adapters.
pub fn assemble_services<P, R>(
    identity_provider: Arc<P>,
    account_repo: Arc<R>,
    alias_words: AliasWords,
    bounds: RetryBounds,
    telemetry: Telemetry,
) -> WalletServices
where
    P: IdentityProvider + 'static,
    R: AccountRepository + 'static,
{
    let identifiers = IdentifierGenerator::new(
        Arc::clone(&account_repo),
        alias_words,
        bounds.identifier_attempts,
    );

    WalletServices {
        registration: Arc::new(RegistrationService::new(
            Arc::clone(&identity_provider),
            Arc::clone(&account_repo),
            identifiers,
            bounds.registration_attempts,
            telemetry.clone(),
        )),
        account_update: Arc::new(AccountUpdateService::new(
            Arc::clone(&identity_provider),
            Arc::clone(&account_repo),
            telemetry.clone(),
        )),
        authorization: Arc::new(AuthorizationService::new(
            Arc::clone(&identity_provider),
            Arc::clone(&account_repo),
            telemetry.clone(),
        )),
        session: Arc::new(SessionService::new(
            Arc::clone(&identity_provider),
            telemetry.clone(),
        )),
        directory: Arc::new(AccountDirectoryService::new(
            identity_provider,
            account_repo,
            telemetry,
        )),
    }
}

/// Run migrations, then build the Keycloak and Diesel adapters and every
/// service over them.
///
/// # Examples
///
/// ```rust,no_run
/// use wallet::bootstrap::{WalletSettings, build_services};
/// use wallet::telemetry::Telemetry;
/// # use ortho_config::OrthoConfig;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let settings = WalletSettings::load_from_iter(std::env::args_os())?;
/// let services = build_services(&settings, Telemetry::from_env()).await?;
/// # let _ = services;
/// # Ok(())
/// # }
/// ```
pub async fn build_services(
    settings: &WalletSettings,
    telemetry: Telemetry,
) -> Result<WalletServices, BootstrapError> {
    let bounds = RetryBounds {
        identifier_attempts: settings.identifier_max_attempts()?,
        registration_attempts: settings.registration_max_attempts()?,
    };
    let keycloak_settings = settings.keycloak_settings()?;
    let pool_config = settings.pool_config()?;
    let alias_words = load_alias_words(&settings.alias_words_path())?;

    telemetry
        .scope(run_pending_migrations(pool_config.database_url()))
        .await?;
    let pool = DbPool::new(pool_config).await?;
    let identity_provider = KeycloakIdentityProvider::new(keycloak_settings)?;

    info!(
        identifier_attempts = bounds.identifier_attempts.get(),
        registration_attempts = bounds.registration_attempts.get(),
        "wallet services assembled"
    );
    Ok(assemble_services(
        Arc::new(identity_provider),
        Arc::new(DieselAccountRepository::new(pool)),
        alias_words,
        bounds,
        telemetry,
    ))
}
