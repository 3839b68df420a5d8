//! Tests for the account update service.

use std::sync::Arc;

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ports::{AccountChangesPayload, MockAccountRepository, MockIdentityProvider};
use crate::domain::{
    AuthId, Balance, Cvu, Dni, ErrorCode, Identity, PersonName, PhoneNumber, User, UserId,
};

const OWNER: &str = "owner-auth-id";

#[fixture]
fn account() -> Account {
    Account {
        id: AccountId::new(7).expect("valid account id"),
        user_id: UserId::new(11).expect("valid user id"),
        auth_id: AuthId::new(OWNER).expect("valid auth id"),
        cvu: Cvu::parse("0000000000000000420001").expect("valid cvu"),
        alias: Alias::parse("sol.luna.mar").expect("valid alias"),
        balance: Balance::ZERO,
    }
}

fn stored_user(dni: i64) -> User {
    User {
        id: UserId::new(11).expect("valid user id"),
        dni: Dni::new(dni).expect("valid dni"),
        phone: PhoneNumber::new(1_155_550_000).expect("valid phone"),
    }
}

fn identity(auth_id: &str, email: &str) -> Identity {
    Identity {
        auth_id: AuthId::new(auth_id).expect("valid auth id"),
        first_name: PersonName::new("Ana").expect("valid name"),
        last_name: PersonName::new("García").expect("valid name"),
        email: Email::new(email).expect("valid email"),
        email_verified: true,
        enabled: true,
    }
}

fn changes(payload: AccountChangesPayload) -> AccountChanges {
    AccountChanges::try_from(payload).expect("valid changes")
}

fn account_found(repo: &mut MockAccountRepository, account: Account) {
    repo.expect_find_account_by_id()
        .times(1)
        .return_once(move |_| Ok(Some(account)));
}

fn service(
    idp: MockIdentityProvider,
    repo: MockAccountRepository,
) -> AccountUpdateService<MockIdentityProvider, MockAccountRepository> {
    AccountUpdateService::new(Arc::new(idp), Arc::new(repo), Telemetry::disabled())
}

#[rstest]
#[tokio::test]
async fn update_fails_for_unknown_account() {
    let mut repo = MockAccountRepository::new();
    repo.expect_find_account_by_id()
        .times(1)
        .returning(|_| Ok(None));
    let mut idp = MockIdentityProvider::new();
    idp.expect_update_identity().times(0);

    let err = service(idp, repo)
        .update_account(
            AccountId::new(99).expect("valid id"),
            changes(AccountChangesPayload {
                name: Some("Eva".to_owned()),
                ..AccountChangesPayload::default()
            }),
        )
        .await
        .expect_err("missing account");

    assert_eq!(err.code(), ErrorCode::AccountNotFound);
}

#[rstest]
#[tokio::test]
async fn dni_only_change_skips_identity_provider(account: Account) {
    let mut repo = MockAccountRepository::new();
    account_found(&mut repo, account.clone());
    repo.expect_update_user_fields()
        .withf(|id, changes| {
            id.get() == 11
                && changes.dni.map(Dni::get) == Some(40_000_000)
                && changes.phone.is_none()
        })
        .times(1)
        .returning(|_, _| Ok(true));
    repo.expect_find_user_by_id()
        .times(1)
        .returning(|_| Ok(Some(stored_user(40_000_000))));

    let mut idp = MockIdentityProvider::new();
    idp.expect_find_identities().times(0);
    idp.expect_update_identity().times(0);

    let snapshot = service(idp, repo)
        .update_account(
            account.id,
            changes(AccountChangesPayload {
                dni: Some(40_000_000),
                ..AccountChangesPayload::default()
            }),
        )
        .await
        .expect("update succeeds");

    assert_eq!(snapshot.user.dni.get(), 40_000_000);
    assert_eq!(snapshot.account, account);
}

#[rstest]
#[tokio::test]
async fn name_change_updates_identity_only(account: Account) {
    let mut repo = MockAccountRepository::new();
    account_found(&mut repo, account.clone());
    repo.expect_update_user_fields().times(0);
    repo.expect_find_user_by_id()
        .returning(|_| Ok(Some(stored_user(30_111_222))));

    let mut idp = MockIdentityProvider::new();
    idp.expect_update_identity()
        .withf(|auth_id, changes| {
            auth_id.as_str() == OWNER
                && changes.first_name.as_ref().map(PersonName::as_str) == Some("Eva")
                && changes.last_name.is_none()
                && changes.email.is_none()
        })
        .times(1)
        .returning(|_, _| Ok(()));

    service(idp, repo)
        .update_account(
            account.id,
            changes(AccountChangesPayload {
                name: Some("Eva".to_owned()),
                ..AccountChangesPayload::default()
            }),
        )
        .await
        .expect("update succeeds");
}

#[rstest]
#[tokio::test]
async fn email_held_by_another_identity_is_rejected(account: Account) {
    let mut repo = MockAccountRepository::new();
    account_found(&mut repo, account.clone());
    repo.expect_update_user_fields().times(0);

    let mut idp = MockIdentityProvider::new();
    idp.expect_find_identities()
        .withf(|filter| {
            matches!(filter, IdentityFilter::ByEmail(email) if email.as_str() == "eva@example.com")
        })
        .times(1)
        .returning(|_| Ok(vec![identity("someone-else", "eva@example.com")]));
    idp.expect_update_identity().times(0);

    let err = service(idp, repo)
        .update_account(
            account.id,
            changes(AccountChangesPayload {
                email: Some("eva@example.com".to_owned()),
                dni: Some(40_000_000),
                ..AccountChangesPayload::default()
            }),
        )
        .await
        .expect_err("email taken");

    assert_eq!(err.code(), ErrorCode::EmailAlreadyRegistered);
}

#[rstest]
#[tokio::test]
async fn resubmitting_own_email_is_allowed(account: Account) {
    let mut repo = MockAccountRepository::new();
    account_found(&mut repo, account.clone());
    repo.expect_find_user_by_id()
        .returning(|_| Ok(Some(stored_user(30_111_222))));

    let mut idp = MockIdentityProvider::new();
    idp.expect_find_identities()
        .returning(|_| Ok(vec![identity(OWNER, "ana@example.com")]));
    idp.expect_update_identity()
        .times(1)
        .returning(|_, _| Ok(()));

    service(idp, repo)
        .update_account(
            account.id,
            changes(AccountChangesPayload {
                email: Some("ana@example.com".to_owned()),
                ..AccountChangesPayload::default()
            }),
        )
        .await
        .expect("own email is fine");
}

#[rstest]
#[tokio::test]
async fn identity_update_failure_is_internal(account: Account) {
    let mut repo = MockAccountRepository::new();
    account_found(&mut repo, account.clone());
    repo.expect_update_user_fields().times(0);

    let mut idp = MockIdentityProvider::new();
    idp.expect_update_identity()
        .returning(|_, _| Err(IdentityProviderError::rejected("status 500")));

    let err = service(idp, repo)
        .update_account(
            account.id,
            changes(AccountChangesPayload {
                last_name: Some("Pérez".to_owned()),
                phone: Some(1_166_660_000),
                ..AccountChangesPayload::default()
            }),
        )
        .await
        .expect_err("provider fails");

    assert_eq!(err.code(), ErrorCode::InternalError);
}

#[rstest]
#[tokio::test]
async fn change_alias_updates_free_alias(account: Account) {
    let mut repo = MockAccountRepository::new();
    account_found(&mut repo, account.clone());
    repo.expect_alias_exists()
        .withf(|alias| alias.as_str() == "rio.monte.valle")
        .times(1)
        .returning(|_| Ok(false));
    repo.expect_update_alias()
        .withf(|id, alias| id.get() == 7 && alias.as_str() == "rio.monte.valle")
        .times(1)
        .returning(|_, _| Ok(true));

    service(MockIdentityProvider::new(), repo)
        .change_alias(
            account.id,
            Alias::parse("rio.monte.valle").expect("valid alias"),
        )
        .await
        .expect("alias changes");
}

#[rstest]
#[tokio::test]
async fn change_alias_rejects_taken_alias(account: Account) {
    let mut repo = MockAccountRepository::new();
    account_found(&mut repo, account.clone());
    repo.expect_alias_exists().returning(|_| Ok(true));
    repo.expect_update_alias().times(0);

    let err = service(MockIdentityProvider::new(), repo)
        .change_alias(account.id, account.alias.clone())
        .await
        .expect_err("alias taken");

    assert_eq!(err.code(), ErrorCode::AliasAlreadyExists);
}

#[rstest]
#[tokio::test]
async fn change_alias_maps_concurrent_claim(account: Account) {
    let mut repo = MockAccountRepository::new();
    account_found(&mut repo, account.clone());
    repo.expect_alias_exists().returning(|_| Ok(false));
    repo.expect_update_alias()
        .returning(|_, _| Err(AccountPersistenceError::duplicate(UniqueField::Alias)));

    let err = service(MockIdentityProvider::new(), repo)
        .change_alias(
            account.id,
            Alias::parse("rio.monte.valle").expect("valid alias"),
        )
        .await
        .expect_err("lost the race");

    assert_eq!(err.code(), ErrorCode::AliasAlreadyExists);
}

#[rstest]
#[tokio::test]
async fn change_alias_fails_for_unknown_account() {
    let mut repo = MockAccountRepository::new();
    repo.expect_find_account_by_id().returning(|_| Ok(None));
    repo.expect_alias_exists().times(0);

    let err = service(MockIdentityProvider::new(), repo)
        .change_alias(
            AccountId::new(99).expect("valid id"),
            Alias::parse("rio.monte.valle").expect("valid alias"),
        )
        .await
        .expect_err("missing account");

    assert_eq!(err.code(), ErrorCode::AccountNotFound);
}
