//! Post-registration account changes.
//!
//! Identity fields (names, email) are written to the identity provider;
//! DNI and phone are written to the local user row. The two writes are
//! independent: a local failure does not undo an identity update.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::failures::{identity_failure, store_failure};
use super::ports::{
    AccountChanges, AccountPersistenceError, AccountRepository, AccountUpdateCommand,
    IdentityProvider, IdentityProviderError, UniqueField,
};
use super::{Account, AccountId, AccountSnapshot, Alias, Email, Error, IdentityFilter};
use crate::telemetry::Telemetry;

/// Update service implementing [`AccountUpdateCommand`].
pub struct AccountUpdateService<P, R> {
    identity_provider: Arc<P>,
    account_repo: Arc<R>,
    telemetry: Telemetry,
}

impl<P, R> AccountUpdateService<P, R> {
    /// Create an update service.
    pub fn new(identity_provider: Arc<P>, account_repo: Arc<R>, telemetry: Telemetry) -> Self {
        Self {
            identity_provider,
            account_repo,
            telemetry,
        }
    }
}

impl<P, R> AccountUpdateService<P, R>
where
    P: IdentityProvider,
    R: AccountRepository,
{
    async fn load_account(&self, account_id: AccountId) -> Result<Account, Error> {
        self.account_repo
            .find_account_by_id(account_id)
            .await
            .map_err(|err| store_failure("load account", err))?
            .ok_or_else(Error::account_not_found)
    }

    async fn ensure_email_available(&self, email: &Email, account: &Account) -> Result<(), Error> {
        let holders = self
            .identity_provider
            .find_identities(&IdentityFilter::ByEmail(email.clone()))
            .await
            .map_err(|err| identity_failure("look up identity", err))?;
        if holders.iter().any(|identity| identity.auth_id != account.auth_id) {
            return Err(Error::email_already_registered());
        }
        Ok(())
    }

    async fn update_inner(
        &self,
        account_id: AccountId,
        changes: AccountChanges,
    ) -> Result<AccountSnapshot, Error> {
        let account = self.load_account(account_id).await?;

        if let Some(email) = changes.email.as_ref() {
            self.ensure_email_available(email, &account).await?;
        }

        let identity_changes = changes.identity_changes();
        if !identity_changes.is_empty() {
            match self
                .identity_provider
                .update_identity(&account.auth_id, &identity_changes)
                .await
            {
                Ok(()) => {}
                Err(IdentityProviderError::Conflict { .. }) => {
                    return Err(Error::email_already_registered());
                }
                Err(err) => return Err(identity_failure("update identity", err)),
            }
        }

        let user_changes = changes.user_changes();
        if !user_changes.is_empty() {
            let updated = self
                .account_repo
                .update_user_fields(account.user_id, user_changes)
                .await
                .map_err(|err| store_failure("update user", err))?;
            if !updated {
                error!(account_id = %account.id, user_id = %account.user_id, "account has no user row");
                return Err(Error::internal("update user failed"));
            }
        }

        let user = self
            .account_repo
            .find_user_by_id(account.user_id)
            .await
            .map_err(|err| store_failure("load user", err))?
            .ok_or_else(|| {
                error!(account_id = %account.id, user_id = %account.user_id, "account has no user row");
                Error::internal("load user failed")
            })?;

        info!(account_id = %account.id, "account updated");
        Ok(AccountSnapshot { account, user })
    }

    async fn change_alias_inner(&self, account_id: AccountId, alias: Alias) -> Result<(), Error> {
        self.load_account(account_id).await?;

        let taken = self
            .account_repo
            .alias_exists(&alias)
            .await
            .map_err(|err| store_failure("check alias", err))?;
        if taken {
            return Err(Error::alias_already_exists());
        }

        match self.account_repo.update_alias(account_id, &alias).await {
            Ok(true) => {
                info!(account_id = %account_id, alias = %alias, "alias changed");
                Ok(())
            }
            Ok(false) => Err(Error::account_not_found()),
            Err(AccountPersistenceError::Duplicate {
                field: UniqueField::Alias,
            }) => Err(Error::alias_already_exists()),
            Err(err) => Err(store_failure("update alias", err)),
        }
    }
}

#[async_trait]
impl<P, R> AccountUpdateCommand for AccountUpdateService<P, R>
where
    P: IdentityProvider,
    R: AccountRepository,
{
    async fn update_account(
        &self,
        account_id: AccountId,
        changes: AccountChanges,
    ) -> Result<AccountSnapshot, Error> {
        self.telemetry
            .scope(self.update_inner(account_id, changes))
            .await
    }

    async fn change_alias(&self, account_id: AccountId, alias: Alias) -> Result<(), Error> {
        self.telemetry
            .scope(self.change_alias_inner(account_id, alias))
            .await
    }
}

#[cfg(test)]
#[path = "account_update_tests.rs"]
mod tests;
