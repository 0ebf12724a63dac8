//! Shared test utilities for vault integration tests
#![allow(dead_code)]

use common::gate::Caller;
use common::testkit::TestVault;

/// Route `tracing` output to the test writer. Honors `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh vault with `alice` and `bob` registered and logged in.
pub async fn setup_test_env() -> (TestVault, Caller, Caller) {
    init_logging();
    let tv = TestVault::new();
    let alice = tv.user("alice").await;
    let bob = tv.user("bob").await;
    (tv, alice, bob)
}

/// Like [`setup_test_env`], with `alice` owning `db-pass` = `s3cr3t`.
pub async fn setup_with_secret() -> (TestVault, Caller, Caller) {
    let (tv, alice, bob) = setup_test_env().await;
    tv.create_secret(&tv.ctx(), &alice, "db-pass", "s3cr3t")
        .await
        .unwrap();
    (tv, alice, bob)
}
