//! Shared helpers for integration tests that run against embedded PostgreSQL.
//!
//! Integration tests compile as separate crates, so suites pull this module in
//! with `mod support;`.

mod cluster_skip;

pub use cluster_skip::{handle_cluster_setup_failure, pg_embedded_enabled};

use diesel::Connection;
use diesel::pg::PgConnection;
use pg_embedded_setup_unpriv::TestCluster;
use wallet::outbound::persistence::run_pending_migrations_blocking;

/// A running cluster whose `postgres` database carries the wallet schema.
pub struct MigratedDatabase {
    pub database_url: String,
    _cluster: TestCluster,
}

impl MigratedDatabase {
    /// Open a blocking connection for assertions that bypass the repository.
    pub fn connect(&self) -> PgConnection {
        PgConnection::establish(&self.database_url).expect("direct connection to test database")
    }
}

/// Start a cluster and apply every embedded migration.
///
/// Returns `None` when the cluster cannot start and `SKIP_TEST_CLUSTER` is
/// set.
pub fn migrated_database() -> Option<MigratedDatabase> {
    let cluster = match TestCluster::new() {
        Ok(cluster) => cluster,
        Err(err) => return handle_cluster_setup_failure(err),
    };
    let database_url = cluster.connection().database_url("postgres");
    let applied = run_pending_migrations_blocking(&database_url).expect("migrations apply");
    assert!(!applied.is_empty(), "at least one migration should apply");
    Some(MigratedDatabase {
        database_url,
        _cluster: cluster,
    })
}
