//! End-to-end HTTP tests against in-memory SQLite and object storage.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::common::{TestApp, PASSWORD};

#[tokio::test]
async fn test_health_probes() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/_status/livez", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = app.send(Method::GET, "/_status/readyz", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new().await;
    let (status, _) = app.send(Method::GET, "/api/v9/nothing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_register_login_validate() {
    let app = TestApp::new().await;
    let token = app.user("alice").await;

    let (status, identity) = app.get("/api/v0/auth/validate", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(identity["handle"], "alice");

    let (status, session) = app
        .send(Method::POST, "/api/v0/auth/refresh", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["identity"]["handle"], "alice");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v0/auth/login",
            None,
            Some(json!({ "handle": "alice", "password": "not the password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "unauthorized");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = TestApp::new().await;
    app.user("alice").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v0/auth/register",
            None,
            Some(json!({ "handle": "alice", "name": "Alice Again", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_exists");
}

#[tokio::test]
async fn test_invalid_input_is_400() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v0/auth/register",
            None,
            Some(json!({ "handle": "A!", "name": "x", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");
}

#[tokio::test]
async fn test_missing_or_bad_token_is_401() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(Method::GET, "/api/v0/secrets", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/v0/secrets", "garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_secret_crud() {
    let app = TestApp::new().await;
    let token = app.user("alice").await;

    app.put_secret(&token, "db-pass", "s3cr3t").await;
    app.put_secret(&token, "api-key", "k").await;

    let (status, secret) = app.get("/api/v0/secrets/db-pass", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(secret["value"], "s3cr3t");

    app.put_secret(&token, "db-pass", "rotated").await;
    let (_, secret) = app.get("/api/v0/secrets/db-pass", &token).await;
    assert_eq!(secret["value"], "rotated");

    let (status, list) = app.get("/api/v0/secrets", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);

    let (status, _) = app
        .send(Method::DELETE, "/api/v0/secrets/db-pass", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.get("/api/v0/secrets/db-pass", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_share_then_read_as_target() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    app.put_secret(&alice, "db-pass", "s3cr3t").await;

    // not shared yet
    let (status, _) = app.get("/api/v0/secrets/alice:db-pass", &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, share) = app
        .send(
            Method::POST,
            "/api/v0/shares",
            Some(&alice),
            Some(json!({ "key": "db-pass", "targets": ["bob"], "expiry": { "type": "never" } })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(share["targets"], json!(["bob"]));
    assert!(share["until"].is_null());

    let (status, secret) = app.get("/api/v0/secrets/alice:db-pass", &bob).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(secret["value"], "s3cr3t");

    let (_, received) = app.get("/api/v0/shares/received", &bob).await;
    assert_eq!(received.as_array().unwrap().len(), 1);
    assert_eq!(received[0]["owner"], "alice");

    let (_, owned) = app.get("/api/v0/shares", &alice).await;
    assert_eq!(owned.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            Method::DELETE,
            "/api/v0/shares/db-pass/bob",
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/api/v0/secrets/alice:db-pass", &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expired_share_is_not_readable() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    app.put_secret(&alice, "db-pass", "s3cr3t").await;

    let past = (OffsetDateTime::now_utc() - time::Duration::hours(1))
        .format(&Rfc3339)
        .unwrap();
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v0/shares",
            Some(&alice),
            Some(json!({
                "key": "db-pass",
                "targets": ["bob"],
                "expiry": { "type": "until", "at": past }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.get("/api/v0/secrets/alice:db-pass", &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the read reaped the relation
    let (_, received) = app.get("/api/v0/shares/received", &bob).await;
    assert!(received.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_share_duration_is_400() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    app.user("bob").await;
    app.put_secret(&alice, "db-pass", "s3cr3t").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v0/shares",
            Some(&alice),
            Some(json!({
                "key": "db-pass",
                "targets": ["bob"],
                "expiry": { "type": "for", "seconds": 400_000_000_000i64 }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");

    // the daemon is still serving
    let (status, _) = app.get("/api/v0/shares", &alice).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_purge_share_removes_every_target() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    let carol = app.user("carol").await;
    app.put_secret(&alice, "db-pass", "s3cr3t").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v0/shares",
            Some(&alice),
            Some(json!({ "key": "db-pass", "targets": ["bob", "carol"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .send(Method::DELETE, "/api/v0/shares/db-pass", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    for token in [&bob, &carol] {
        let (status, _) = app.get("/api/v0/secrets/alice:db-pass", token).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
    let (status, shares) = app.get("/api/v0/shares/db-pass", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert!(shares.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_users_may_only_modify_themselves() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;

    let (status, users) = app.get("/api/v0/users", &bob).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);

    let (status, body) = app
        .send(
            Method::PATCH,
            "/api/v0/users/alice",
            Some(&bob),
            Some(json!({ "name": "Mallory" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, profile) = app
        .send(
            Method::PATCH,
            "/api/v0/users/alice",
            Some(&alice),
            Some(json!({ "name": "Alice Liddell" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["name"], "Alice Liddell");
    assert!(profile.get("password_hash").is_none());
}

#[tokio::test]
async fn test_delete_user_removes_profile() {
    let app = TestApp::new().await;
    let alice = app.user("alice").await;
    let bob = app.user("bob").await;
    app.put_secret(&alice, "db-pass", "s3cr3t").await;

    let (status, _) = app
        .send(Method::DELETE, "/api/v0/users/alice", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/api/v0/users/alice", &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the handle is free again
    app.user("alice").await;
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new().await;
    let token = app.user("alice").await;

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/v0/auth/password",
            Some(&token),
            Some(json!({ "current": "wrong password", "new": "brand new secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/v0/auth/password",
            Some(&token),
            Some(json!({ "current": PASSWORD, "new": "brand new secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v0/auth/login",
            None,
            Some(json!({ "handle": "alice", "password": "brand new secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout() {
    let app = TestApp::new().await;
    let token = app.user("alice").await;
    let (status, _) = app
        .send(Method::POST, "/api/v0/auth/logout", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
