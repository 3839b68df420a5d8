//! Opt-in and skip policy for tests that need an embedded PostgreSQL cluster.

/// True when `RUN_PG_EMBEDDED=1`; otherwise prints a skip marker.
pub fn pg_embedded_enabled() -> bool {
    if std::env::var("RUN_PG_EMBEDDED").as_deref() == Ok("1") {
        return true;
    }
    eprintln!("SKIP-TEST-CLUSTER: set RUN_PG_EMBEDDED=1 to run");
    false
}

/// Returns true when the `SKIP_TEST_CLUSTER` environment variable is set to a
/// truthy value ("1", "true", "yes", case-insensitive).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Handles embedded cluster setup failures consistently across suites.
///
/// When `SKIP_TEST_CLUSTER` is truthy, prints a skip marker and returns `None`.
/// Otherwise, panics so CI breakage is not masked.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
