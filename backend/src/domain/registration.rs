//! Registration orchestration.
//!
//! Creates the identity first, then the local user/account pair with fresh
//! identifiers. A uniqueness collision at insert time regenerates both
//! identifiers and retries the insert, up to a bound.
//!
//! The identity is not rolled back when the local insert fails. The
//! orphaned identity is logged with its auth id for reconciliation.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::failures::{identity_failure, store_failure};
use super::identifiers::IdentifierGenerator;
use super::ports::{
    AccountPersistenceError, AccountRepository, IdentityProvider, IdentityProviderError,
    RegisteredAccount, RegistrationCommand, RegistrationRequest,
};
use super::{AccountSnapshot, AuthId, Error, NewAccount, NewIdentity};
use crate::telemetry::Telemetry;

/// Registration service implementing [`RegistrationCommand`].
pub struct RegistrationService<P, R> {
    identity_provider: Arc<P>,
    account_repo: Arc<R>,
    identifiers: IdentifierGenerator<R>,
    max_insert_attempts: NonZeroU32,
    telemetry: Telemetry,
}

impl<P, R> RegistrationService<P, R> {
    /// Create a registration service.
    pub fn new(
        identity_provider: Arc<P>,
        account_repo: Arc<R>,
        identifiers: IdentifierGenerator<R>,
        max_insert_attempts: NonZeroU32,
        telemetry: Telemetry,
    ) -> Self {
        Self {
            identity_provider,
            account_repo,
            identifiers,
            max_insert_attempts,
            telemetry,
        }
    }
}

impl<P, R> RegistrationService<P, R>
where
    P: IdentityProvider,
    R: AccountRepository,
{
    async fn create_identity(&self, request: &RegistrationRequest) -> Result<AuthId, Error> {
        let exists = self
            .identity_provider
            .identity_exists_by_email(&request.email)
            .await
            .map_err(|err| identity_failure("look up identity", err))?;
        if exists {
            return Err(Error::email_already_registered());
        }

        let identity = NewIdentity {
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: request.email.clone(),
            password: request.password.clone(),
        };
        match self.identity_provider.register_identity(&identity).await {
            Ok(auth_id) => Ok(auth_id),
            Err(IdentityProviderError::Conflict { .. }) => Err(Error::email_already_registered()),
            Err(err) => Err(identity_failure("create identity", err)),
        }
    }

    async fn persist_account(
        &self,
        auth_id: &AuthId,
        request: &RegistrationRequest,
    ) -> Result<AccountSnapshot, Error> {
        for attempt in 1..=self.max_insert_attempts.get() {
            let cvu = self.identifiers.generate_cvu().await?;
            let alias = self.identifiers.generate_alias().await?;
            let new_account = NewAccount {
                auth_id: auth_id.clone(),
                dni: request.dni,
                phone: request.phone,
                cvu,
                alias,
            };
            match self.account_repo.insert_user_and_account(&new_account).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(AccountPersistenceError::Duplicate { field }) if field.is_generated() => {
                    debug!(attempt, %field, "identifier collided at insert; regenerating");
                }
                Err(err) => return Err(store_failure("insert account", err)),
            }
        }
        Err(Error::exhausted_retries())
    }

    async fn register_inner(&self, request: RegistrationRequest) -> Result<RegisteredAccount, Error> {
        let auth_id = self.create_identity(&request).await?;

        let snapshot = match self.persist_account(&auth_id, &request).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(auth_id = %auth_id, "identity created without a local account");
                return Err(err);
            }
        };

        if let Err(err) = self.identity_provider.send_verification_email(&auth_id).await {
            warn!(auth_id = %auth_id, error = %err, "verification email not sent");
        }

        info!(
            account_id = %snapshot.account.id,
            user_id = %snapshot.user.id,
            "account registered"
        );
        Ok(RegisteredAccount {
            account_id: snapshot.account.id,
            user_id: snapshot.user.id,
            name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            dni: snapshot.user.dni,
            phone: snapshot.user.phone,
            cvu: snapshot.account.cvu,
            alias: snapshot.account.alias,
        })
    }
}

#[async_trait]
impl<P, R> RegistrationCommand for RegistrationService<P, R>
where
    P: IdentityProvider,
    R: AccountRepository,
{
    async fn register(&self, request: RegistrationRequest) -> Result<RegisteredAccount, Error> {
        self.telemetry.scope(self.register_inner(request)).await
    }
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod tests;
