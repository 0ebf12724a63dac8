//! Integration tests for secret create, read, list and delete

mod common;

use ::common::context::Context;
use ::common::error::VaultError;
use ::common::share::ShareRequest;
use ::common::store::{user_bucket, CiphertextStore, MetadataStore};
use ::common::testkit::MetadataOp;

#[tokio::test]
async fn test_create_then_read() {
    let (tv, alice, _) = common::setup_test_env().await;
    let ctx = tv.ctx();

    let created = tv
        .create_secret(&ctx, &alice, "db-pass", "s3cr3t")
        .await
        .unwrap();
    assert_eq!(created.value, "s3cr3t");

    let read = tv.read_secret(&ctx, &alice, "db-pass").await.unwrap();
    assert_eq!(read, created);
    assert!(read.created_at.is_some());
}

#[tokio::test]
async fn test_value_is_stored_encrypted() {
    let (tv, alice, _) = common::setup_with_secret().await;

    let sealed = tv
        .memory_ciphertext
        .get(&user_bucket(alice.id()), "db-pass")
        .await
        .unwrap();
    assert!(!sealed.windows(6).any(|w| w == b"s3cr3t"));
}

#[tokio::test]
async fn test_overwrite_replaces_value_and_drops_shares() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    tv.create_share(&ctx, &alice, ShareRequest::new("db-pass", ["bob"]))
        .await
        .unwrap();
    let before = tv
        .memory_metadata
        .secret(alice.id(), "db-pass")
        .await
        .unwrap();

    tv.create_secret(&ctx, &alice, "db-pass", "n3w").await.unwrap();

    let read = tv.read_secret(&ctx, &alice, "db-pass").await.unwrap();
    assert_eq!(read.value, "n3w");

    let after = tv
        .memory_metadata
        .secret(alice.id(), "db-pass")
        .await
        .unwrap();
    assert_ne!(before.id, after.id);
    assert_eq!(tv.memory_metadata.list_secrets(alice.id()).await.unwrap().len(), 1);
    // cipher key + the one value
    assert_eq!(tv.memory_ciphertext.len(&user_bucket(alice.id())), 2);

    let err = tv
        .read_secret(&ctx, &bob, "alice:db-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::NotShared(_)));
}

#[tokio::test]
async fn test_read_missing_secret() {
    let (tv, alice, _) = common::setup_test_env().await;
    let err = tv
        .read_secret(&tv.ctx(), &alice, "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::NotFound(_)));
}

#[tokio::test]
async fn test_owners_are_isolated() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    tv.create_secret(&ctx, &bob, "db-pass", "b0b").await.unwrap();

    assert_eq!(
        tv.read_secret(&ctx, &alice, "db-pass").await.unwrap().value,
        "s3cr3t"
    );
    assert_eq!(
        tv.read_secret(&ctx, &bob, "db-pass").await.unwrap().value,
        "b0b"
    );
}

#[tokio::test]
async fn test_list_returns_own_then_received() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    tv.create_secret(&ctx, &alice, "api-key", "k3y").await.unwrap();
    tv.create_secret(&ctx, &bob, "token", "t0k").await.unwrap();
    tv.create_share(&ctx, &bob, ShareRequest::new("token", ["alice"]))
        .await
        .unwrap();

    let listed = tv.list_secrets(&ctx, &alice).await.unwrap();
    let pairs: Vec<_> = listed
        .iter()
        .map(|s| (s.key.as_str(), s.value.as_str(), s.created_at.is_some()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("db-pass", "s3cr3t", true),
            ("api-key", "k3y", true),
            ("bob:token", "t0k", false),
        ]
    );
}

#[tokio::test]
async fn test_list_skips_shares_whose_value_is_gone() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    tv.create_share(&ctx, &alice, ShareRequest::new("db-pass", ["bob"]))
        .await
        .unwrap();

    // leave a dangling relation behind, as a partial failure elsewhere would
    tv.memory_ciphertext
        .delete(&user_bucket(alice.id()), "db-pass")
        .await
        .unwrap();

    assert!(tv.list_secrets(&ctx, &bob).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_removes_value_metadata_and_shares() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    tv.create_share(&ctx, &alice, ShareRequest::new("db-pass", ["bob"]))
        .await
        .unwrap();

    tv.delete_secret(&ctx, &alice, "db-pass").await.unwrap();

    assert!(matches!(
        tv.read_secret(&ctx, &alice, "db-pass").await,
        Err(VaultError::NotFound(_))
    ));
    assert!(tv.list_shares(&ctx, &alice).await.unwrap().is_empty());
    assert!(tv.list_received(&ctx, &bob).await.unwrap().is_empty());
    assert_eq!(tv.memory_ciphertext.len(&user_bucket(alice.id())), 1);

    assert!(matches!(
        tv.delete_secret(&ctx, &alice, "db-pass").await,
        Err(VaultError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_tolerates_missing_ciphertext() {
    let (tv, alice, _) = common::setup_with_secret().await;
    tv.memory_ciphertext
        .delete(&user_bucket(alice.id()), "db-pass")
        .await
        .unwrap();

    tv.delete_secret(&tv.ctx(), &alice, "db-pass").await.unwrap();
    assert!(tv
        .memory_metadata
        .list_secrets(alice.id())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_keys_naming_another_owner_are_rejected() {
    let (tv, _, bob) = common::setup_test_env().await;
    let ctx = tv.ctx();

    // "alice:x" would always be read as alice's shared secret
    let err = tv
        .create_secret(&ctx, &bob, "alice:x", "mine")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::InvalidInput(_)), "{err}");
    assert!(tv.list_secrets(&ctx, &bob).await.unwrap().is_empty());

    // the caller's own handle, or a prefix that is not a handle, is an own key
    for key in ["bob:x", "A:x", "ab:x"] {
        tv.create_secret(&ctx, &bob, key, "mine").await.unwrap();
        let read = tv.read_secret(&ctx, &bob, key).await.unwrap();
        assert_eq!(read.value, "mine", "{key}");
    }
}

#[tokio::test]
async fn test_invalid_input_never_reaches_a_store() {
    let (tv, alice, _) = common::setup_test_env().await;
    let ctx = tv.ctx();
    let calls = tv.metadata.calls(MetadataOp::UserById);

    for (key, value) in [
        ("__cipher_key", "x"),
        ("has space", "x"),
        ("this-key-is-way-too-long", "x"),
        ("ok", ""),
    ] {
        let err = tv.create_secret(&ctx, &alice, key, value).await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput(_)), "{key}");
    }
    assert_eq!(tv.metadata.calls(MetadataOp::UserById), calls);

    let err = tv
        .read_secret(&ctx, &alice, "__cipher_key")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::InvalidInput(_)));
}

#[tokio::test]
async fn test_cancelled_context_stops_before_any_store_call() {
    let (tv, alice, _) = common::setup_test_env().await;
    let (ctx, cancel) = Context::cancellable();
    cancel.cancel();

    let err = tv
        .create_secret(&ctx, &alice, "db-pass", "s3cr3t")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Cancelled(_)));
    assert!(tv
        .memory_metadata
        .list_secrets(alice.id())
        .await
        .unwrap()
        .is_empty());
}
