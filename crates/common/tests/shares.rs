//! Integration tests for the share lifecycle and lazy expiry

mod common;

use std::collections::BTreeSet;

use ::common::clock::Clock;
use ::common::error::VaultError;
use ::common::share::{Expiry, ShareRequest, DEFAULT_SHARE_TTL};
use ::common::store::MetadataStore;
use ::common::testkit::MetadataOp;
use ::common::validation;
use time::Duration;

#[tokio::test]
async fn test_ten_second_share_window() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();

    tv.create_share(
        &ctx,
        &alice,
        ShareRequest::new("db-pass", ["bob"]).expiring(Expiry::For(Duration::seconds(10))),
    )
    .await
    .unwrap();

    let read = tv.read_secret(&ctx, &bob, "alice:db-pass").await.unwrap();
    assert_eq!(read.value, "s3cr3t");
    assert_eq!(read.key, "alice:db-pass");
    assert_eq!(read.created_at, None);

    tv.clock.advance(Duration::seconds(11));

    let err = tv
        .read_secret(&ctx, &bob, "alice:db-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::NotShared(_)));
    assert!(tv.list_shares(&ctx, &alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_past_deadline_is_reaped_on_first_read() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    let past = tv.clock.now() - Duration::seconds(1);

    tv.create_share(
        &ctx,
        &alice,
        ShareRequest::new("db-pass", ["bob"]).expiring(Expiry::Until(past)),
    )
    .await
    .unwrap();
    assert_eq!(
        tv.memory_metadata
            .shares_by_owner(alice.id())
            .await
            .unwrap()
            .len(),
        1
    );

    let err = tv
        .read_secret(&ctx, &bob, "alice:db-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::NotShared(_)));

    // physically gone, not just hidden
    assert!(tv
        .memory_metadata
        .shares_by_owner(alice.id())
        .await
        .unwrap()
        .is_empty());
    assert!(tv.list_shares(&ctx, &alice).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_default_expiry_is_thirty_days() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    let now = tv.clock.now();

    let share = tv
        .create_share(&ctx, &alice, ShareRequest::new("db-pass", ["bob"]))
        .await
        .unwrap();
    assert_eq!(share.until, Some(now + DEFAULT_SHARE_TTL));

    tv.clock.advance(DEFAULT_SHARE_TTL - Duration::seconds(1));
    assert!(tv.read_secret(&ctx, &bob, "alice:db-pass").await.is_ok());

    tv.clock.advance(Duration::seconds(1));
    assert!(tv.read_secret(&ctx, &bob, "alice:db-pass").await.is_err());
}

#[tokio::test]
async fn test_open_ended_share_never_expires() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    tv.create_share(
        &ctx,
        &alice,
        ShareRequest::new("db-pass", ["bob"]).expiring(Expiry::Never),
    )
    .await
    .unwrap();

    tv.clock.advance(Duration::days(3650));
    assert!(tv.read_secret(&ctx, &bob, "alice:db-pass").await.is_ok());
}

#[tokio::test]
async fn test_shares_merge_by_owner_key_and_deadline() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    tv.user("carol").await;
    tv.user("dave").await;

    tv.create_share(&ctx, &alice, ShareRequest::new("db-pass", ["bob", "carol"]))
        .await
        .unwrap();
    tv.create_share(
        &ctx,
        &alice,
        ShareRequest::new("db-pass", ["dave"]).expiring(Expiry::Never),
    )
    .await
    .unwrap();

    let shares = tv.get_share(&ctx, &alice, "db-pass").await.unwrap();
    assert_eq!(shares.len(), 2);
    let first: BTreeSet<_> = shares[0].targets.iter().map(String::as_str).collect();
    assert_eq!(first, BTreeSet::from(["bob", "carol"]));
    assert_eq!(shares[1].targets, vec!["dave"]);
    assert_eq!(shares[1].until, None);

    assert_eq!(tv.list_shares(&ctx, &alice).await.unwrap(), shares);

    let received = tv.list_received(&ctx, &bob).await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].owner, "alice");
    assert_eq!(received[0].key, "db-pass");
    assert_eq!(received[0].targets, vec!["bob"]);
}

#[tokio::test]
async fn test_resharing_a_live_target_is_rejected() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    tv.user("carol").await;
    tv.create_share(&ctx, &alice, ShareRequest::new("db-pass", ["bob"]))
        .await
        .unwrap();

    let err = tv
        .create_share(&ctx, &alice, ShareRequest::new("db-pass", ["carol", "bob"]))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::AlreadyExists(_)));
    // nothing was created for carol either
    assert_eq!(
        tv.memory_metadata
            .shares_by_owner(alice.id())
            .await
            .unwrap()
            .len(),
        1
    );

    tv.delete_share_target(&ctx, &alice, "db-pass", "bob")
        .await
        .unwrap();
    tv.create_share(&ctx, &alice, ShareRequest::new("db-pass", ["carol", "bob"]))
        .await
        .unwrap();
    assert!(tv.read_secret(&ctx, &bob, "alice:db-pass").await.is_ok());
}

#[tokio::test]
async fn test_expired_target_can_be_shared_again() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    tv.create_share(
        &ctx,
        &alice,
        ShareRequest::new("db-pass", ["bob"]).expiring(Expiry::For(Duration::seconds(5))),
    )
    .await
    .unwrap();
    tv.clock.advance(Duration::seconds(5));

    tv.create_share(&ctx, &alice, ShareRequest::new("db-pass", ["bob"]))
        .await
        .unwrap();
    assert!(tv.read_secret(&ctx, &bob, "alice:db-pass").await.is_ok());
}

#[tokio::test]
async fn test_share_requests_are_validated() {
    let (tv, alice, _) = common::setup_with_secret().await;
    let ctx = tv.ctx();

    let bad = [
        ShareRequest::new("db-pass", Vec::<String>::new()),
        ShareRequest::new("db-pass", ["alice"]),
        ShareRequest::new("db-pass", ["bob", "bob"]),
        ShareRequest::new("db-pass", ["Bob"]),
        ShareRequest::new("db-pass", ["bob"]).expiring(Expiry::For(Duration::ZERO)),
    ];
    for request in bad {
        let err = tv.create_share(&ctx, &alice, request).await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput(_)), "{err}");
    }

    let err = tv
        .create_share(&ctx, &alice, ShareRequest::new("db-pass", ["nobody"]))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::NotFound(_)));

    let err = tv
        .create_share(&ctx, &alice, ShareRequest::new("missing", ["bob"]))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::NotFound(_)));
}

#[tokio::test]
async fn test_out_of_range_duration_is_invalid_input() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();

    for duration in [
        Duration::seconds(400_000_000_000),
        Duration::MAX,
        validation::SHARE_DURATION_MAX + Duration::SECOND,
    ] {
        let err = tv
            .create_share(
                &ctx,
                &alice,
                ShareRequest::new("db-pass", ["bob"]).expiring(Expiry::For(duration)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::InvalidInput(_)), "{err}");
    }

    // nothing was written, so the longest allowed lifetime still works
    assert!(tv.list_shares(&ctx, &alice).await.unwrap().is_empty());
    let share = tv
        .create_share(
            &ctx,
            &alice,
            ShareRequest::new("db-pass", ["bob"])
                .expiring(Expiry::For(validation::SHARE_DURATION_MAX)),
        )
        .await
        .unwrap();
    assert!(share.until.is_some());
    assert!(tv.read_secret(&ctx, &bob, "alice:db-pass").await.is_ok());
}

#[tokio::test]
async fn test_targets_cannot_mutate_shares() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    tv.create_share(&ctx, &alice, ShareRequest::new("db-pass", ["bob"]))
        .await
        .unwrap();

    // mutations are always scoped to the caller's own secrets
    assert!(matches!(
        tv.delete_share_target(&ctx, &bob, "db-pass", "bob").await,
        Err(VaultError::NotFound(_))
    ));
    assert!(matches!(
        tv.purge_share(&ctx, &bob, "db-pass").await,
        Err(VaultError::NotFound(_))
    ));
    assert!(matches!(
        tv.delete_secret(&ctx, &bob, "alice:db-pass").await,
        Err(VaultError::NotFound(_))
    ));
    assert!(tv.read_secret(&ctx, &bob, "alice:db-pass").await.is_ok());
}

#[tokio::test]
async fn test_unknown_owner_reads_as_not_shared() {
    let (tv, _, bob) = common::setup_test_env().await;
    let err = tv
        .read_secret(&tv.ctx(), &bob, "mallory:db-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::NotShared(_)));
}

#[tokio::test]
async fn test_purge_removes_every_target() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    let carol = tv.user("carol").await;
    tv.create_share(&ctx, &alice, ShareRequest::new("db-pass", ["bob", "carol"]))
        .await
        .unwrap();

    tv.purge_share(&ctx, &alice, "db-pass").await.unwrap();

    assert!(tv.get_share(&ctx, &alice, "db-pass").await.unwrap().is_empty());
    for target in [&bob, &carol] {
        assert!(matches!(
            tv.read_secret(&ctx, target, "alice:db-pass").await,
            Err(VaultError::NotShared(_))
        ));
    }
    assert!(matches!(
        tv.purge_share(&ctx, &alice, "db-pass").await,
        Err(VaultError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_share_creation_leaves_no_relation() {
    let (tv, alice, bob) = common::setup_with_secret().await;
    let ctx = tv.ctx();
    tv.user("carol").await;

    tv.metadata.fail_nth(MetadataOp::CreateShare, 2);
    let err = tv
        .create_share(&ctx, &alice, ShareRequest::new("db-pass", ["bob", "carol"]))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Store { .. }));

    assert!(tv.get_share(&ctx, &alice, "db-pass").await.unwrap().is_empty());
    assert!(matches!(
        tv.read_secret(&ctx, &bob, "alice:db-pass").await,
        Err(VaultError::NotShared(_))
    ));
}
