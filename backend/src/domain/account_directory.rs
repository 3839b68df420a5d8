//! Account and user reads.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::failures::{identity_failure, store_failure};
use super::ports::{
    AccountDirectoryQuery, AccountInfo, AccountRepository, IdentityProvider, UserInfo,
};
use super::{AccountId, Error, IdentityFilter, UserId};
use crate::telemetry::Telemetry;

/// Directory service implementing [`AccountDirectoryQuery`].
pub struct AccountDirectoryService<P, R> {
    identity_provider: Arc<P>,
    account_repo: Arc<R>,
    telemetry: Telemetry,
}

impl<P, R> AccountDirectoryService<P, R> {
    /// Create a directory service.
    pub fn new(identity_provider: Arc<P>, account_repo: Arc<R>, telemetry: Telemetry) -> Self {
        Self {
            identity_provider,
            account_repo,
            telemetry,
        }
    }
}

impl<P, R> AccountDirectoryService<P, R>
where
    P: IdentityProvider,
    R: AccountRepository,
{
    async fn account_info_inner(&self, account_id: AccountId) -> Result<AccountInfo, Error> {
        let account = self
            .account_repo
            .find_account_by_id(account_id)
            .await
            .map_err(|err| store_failure("load account", err))?
            .ok_or_else(Error::account_not_found)?;
        Ok(AccountInfo {
            account_id: account.id,
            user_id: account.user_id,
            cvu: account.cvu,
            alias: account.alias,
            balance: account.balance,
        })
    }

    async fn user_info_inner(&self, user_id: UserId) -> Result<UserInfo, Error> {
        let user = self
            .account_repo
            .find_user_by_id(user_id)
            .await
            .map_err(|err| store_failure("load user", err))?
            .ok_or_else(Error::account_not_found)?;
        let account = self
            .account_repo
            .find_account_by_user_id(user_id)
            .await
            .map_err(|err| store_failure("load account", err))?
            .ok_or_else(Error::account_not_found)?;

        let identities = self
            .identity_provider
            .find_identities(&IdentityFilter::ByAuthId(account.auth_id.clone()))
            .await
            .map_err(|err| identity_failure("load identity", err))?;
        let Some(identity) = identities.into_iter().next() else {
            warn!(auth_id = %account.auth_id, user_id = %user_id, "account has no identity");
            return Err(Error::account_not_found());
        };

        Ok(UserInfo {
            user_id: user.id,
            name: identity.first_name,
            last_name: identity.last_name,
            email: identity.email,
            dni: user.dni,
            phone: user.phone,
        })
    }
}

#[async_trait]
impl<P, R> AccountDirectoryQuery for AccountDirectoryService<P, R>
where
    P: IdentityProvider,
    R: AccountRepository,
{
    async fn account_info(&self, account_id: AccountId) -> Result<AccountInfo, Error> {
        self.telemetry
            .scope(self.account_info_inner(account_id))
            .await
    }

    async fn user_info(&self, user_id: UserId) -> Result<UserInfo, Error> {
        self.telemetry.scope(self.user_info_inner(user_id)).await
    }
}
