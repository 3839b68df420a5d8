//! Integration tests for `DieselAccountRepository` against embedded PostgreSQL.
//!
//! Each test starts its own cluster, applies the embedded migrations, and
//! drives the repository from a dedicated Tokio runtime. Enable with
//! `RUN_PG_EMBEDDED=1 cargo test -- --ignored`.

use diesel::RunQueryDsl;
use diesel::sql_types::BigInt;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;
use wallet::domain::ports::{AccountPersistenceError, AccountRepository, UniqueField};
use wallet::domain::{
    AccountId, Alias, AuthId, Balance, Cvu, Dni, NewAccount, PhoneNumber, Resource, UserChanges,
    UserId,
};
use wallet::outbound::persistence::{DbPool, DieselAccountRepository, PoolConfig};

mod support;

use support::{MigratedDatabase, migrated_database, pg_embedded_enabled};

struct Harness {
    runtime: Runtime,
    repository: DieselAccountRepository,
    database: MigratedDatabase,
}

impl Harness {
    fn start() -> Option<Self> {
        if !pg_embedded_enabled() {
            return None;
        }
        let database = migrated_database()?;
        let runtime = Runtime::new().expect("tokio runtime");
        let pool = runtime
            .block_on(DbPool::new(
                PoolConfig::new(database.database_url.clone()).with_max_size(2),
            ))
            .expect("pool builds");
        Some(Self {
            runtime,
            repository: DieselAccountRepository::new(pool),
            database,
        })
    }

    fn user_count(&self) -> i64 {
        let mut conn = self.database.connect();
        diesel::select(diesel::dsl::sql::<BigInt>("(SELECT count(*) FROM users)"))
            .get_result(&mut conn)
            .expect("count users")
    }
}

#[fixture]
fn new_account() -> NewAccount {
    account_values("kc-1", "0000001234567890123456", "sol.luna.mar")
}

fn account_values(auth_id: &str, cvu: &str, alias: &str) -> NewAccount {
    NewAccount {
        auth_id: AuthId::new(auth_id).expect("auth id"),
        dni: Dni::new(30_123_456).expect("dni"),
        phone: PhoneNumber::new(1_155_550_000).expect("phone"),
        cvu: Cvu::parse(cvu).expect("cvu"),
        alias: Alias::parse(alias).expect("alias"),
    }
}

#[rstest]
#[ignore = "requires embedded Postgres binaries; opt-in via RUN_PG_EMBEDDED=1"]
fn inserted_pair_reads_back(new_account: NewAccount) {
    let Some(harness) = Harness::start() else {
        return;
    };
    let repo = &harness.repository;

    let snapshot = harness
        .runtime
        .block_on(repo.insert_user_and_account(&new_account))
        .expect("insert succeeds");
    assert_eq!(snapshot.account.balance, Balance::ZERO);
    assert_eq!(snapshot.account.user_id, snapshot.user.id);
    assert_eq!(snapshot.account.cvu, new_account.cvu);
    assert_eq!(snapshot.user.dni, new_account.dni);

    let by_id = harness
        .runtime
        .block_on(repo.find_account_by_id(snapshot.account.id))
        .expect("lookup");
    assert_eq!(by_id.as_ref(), Some(&snapshot.account));
    let reread = harness
        .runtime
        .block_on(repo.find_account_by_id(snapshot.account.id))
        .expect("lookup");
    assert_eq!(reread, by_id, "repeated reads without a write must agree");

    let by_user = harness
        .runtime
        .block_on(repo.find_account_by_user_id(snapshot.user.id))
        .expect("lookup");
    assert_eq!(by_user, Some(snapshot.account.clone()));

    let user = harness
        .runtime
        .block_on(repo.find_user_by_id(snapshot.user.id))
        .expect("lookup");
    assert_eq!(user, Some(snapshot.user.clone()));

    assert!(harness.runtime.block_on(repo.cvu_exists(&new_account.cvu)).expect("lookup"));
    assert!(harness.runtime.block_on(repo.alias_exists(&new_account.alias)).expect("lookup"));
    let unused = Alias::parse("rio.monte.valle").expect("alias");
    assert!(!harness.runtime.block_on(repo.alias_exists(&unused)).expect("lookup"));
}

#[rstest]
#[case::cvu(account_values("kc-2", "0000001234567890123456", "rio.monte.valle"), UniqueField::Cvu)]
#[case::alias(account_values("kc-2", "0000009999999999999999", "sol.luna.mar"), UniqueField::Alias)]
#[case::auth_id(account_values("kc-1", "0000009999999999999999", "rio.monte.valle"), UniqueField::AuthId)]
#[ignore = "requires embedded Postgres binaries; opt-in via RUN_PG_EMBEDDED=1"]
fn duplicate_columns_roll_back_the_user_row(
    new_account: NewAccount,
    #[case] colliding: NewAccount,
    #[case] field: UniqueField,
) {
    let Some(harness) = Harness::start() else {
        return;
    };
    let repo = &harness.repository;
    harness
        .runtime
        .block_on(repo.insert_user_and_account(&new_account))
        .expect("first insert succeeds");

    let err = harness
        .runtime
        .block_on(repo.insert_user_and_account(&colliding))
        .expect_err("second insert collides");
    assert_eq!(err, AccountPersistenceError::duplicate(field));
    assert_eq!(harness.user_count(), 1, "user row must not outlive the failed account");
}

#[rstest]
#[ignore = "requires embedded Postgres binaries; opt-in via RUN_PG_EMBEDDED=1"]
fn ownership_matches_account_and_user(new_account: NewAccount) {
    let Some(harness) = Harness::start() else {
        return;
    };
    let repo = &harness.repository;
    let snapshot = harness
        .runtime
        .block_on(repo.insert_user_and_account(&new_account))
        .expect("insert succeeds");
    let owner = new_account.auth_id.clone();
    let stranger = AuthId::new("kc-other").expect("auth id");

    for resource in [
        Resource::Account(snapshot.account.id),
        Resource::User(snapshot.user.id),
    ] {
        assert!(harness.runtime.block_on(repo.owns_resource(resource, &owner)).expect("check"));
        assert!(
            !harness
                .runtime
                .block_on(repo.owns_resource(resource, &stranger))
                .expect("check")
        );
    }

    let missing = Resource::Account(AccountId::new(snapshot.account.id.get() + 100).expect("id"));
    assert!(!harness.runtime.block_on(repo.owns_resource(missing, &owner)).expect("check"));
}

#[rstest]
#[ignore = "requires embedded Postgres binaries; opt-in via RUN_PG_EMBEDDED=1"]
fn alias_updates_respect_uniqueness(new_account: NewAccount) {
    let Some(harness) = Harness::start() else {
        return;
    };
    let repo = &harness.repository;
    let first = harness
        .runtime
        .block_on(repo.insert_user_and_account(&new_account))
        .expect("insert succeeds");
    let second = harness
        .runtime
        .block_on(repo.insert_user_and_account(&account_values(
            "kc-2",
            "0000009999999999999999",
            "rio.monte.valle",
        )))
        .expect("insert succeeds");

    let renamed = Alias::parse("nube.arena.cielo").expect("alias");
    assert!(
        harness
            .runtime
            .block_on(repo.update_alias(first.account.id, &renamed))
            .expect("update")
    );
    let stored = harness
        .runtime
        .block_on(repo.find_account_by_id(first.account.id))
        .expect("lookup")
        .expect("account exists");
    assert_eq!(stored.alias, renamed);

    let missing = AccountId::new(second.account.id.get() + 100).expect("id");
    assert!(
        !harness
            .runtime
            .block_on(repo.update_alias(missing, &renamed))
            .expect("update")
    );

    let err = harness
        .runtime
        .block_on(repo.update_alias(second.account.id, &renamed))
        .expect_err("alias is taken");
    assert_eq!(err, AccountPersistenceError::duplicate(UniqueField::Alias));
}

#[rstest]
#[ignore = "requires embedded Postgres binaries; opt-in via RUN_PG_EMBEDDED=1"]
fn user_fields_update_only_supplied_columns(new_account: NewAccount) {
    let Some(harness) = Harness::start() else {
        return;
    };
    let repo = &harness.repository;
    let snapshot = harness
        .runtime
        .block_on(repo.insert_user_and_account(&new_account))
        .expect("insert succeeds");

    let changes = UserChanges {
        phone: Some(PhoneNumber::new(1_166_660_000).expect("phone")),
        ..UserChanges::default()
    };
    assert!(
        harness
            .runtime
            .block_on(repo.update_user_fields(snapshot.user.id, changes))
            .expect("update")
    );
    let user = harness
        .runtime
        .block_on(repo.find_user_by_id(snapshot.user.id))
        .expect("lookup")
        .expect("user exists");
    assert_eq!(user.dni, new_account.dni);
    assert_eq!(user.phone.get(), 1_166_660_000);

    let missing = UserId::new(snapshot.user.id.get() + 100).expect("id");
    assert!(
        !harness
            .runtime
            .block_on(repo.update_user_fields(missing, changes))
            .expect("update")
    );
}
