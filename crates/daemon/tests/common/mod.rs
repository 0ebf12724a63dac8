//! Shared setup for driving the HTTP router in-process
#![allow(dead_code)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use ::common::crypto::{Crypto, PasswordCost};
use object_store::ObjectStoreConfig;
use strongbox_daemon::http_server;
use strongbox_daemon::{ServiceConfig, ServiceState};

pub const PASSWORD: &str = "correct horse";

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory SQLite and object storage, cheap password hashing.
pub fn test_config() -> ServiceConfig {
    let password_cost = PasswordCost::insecure_fast();
    ServiceConfig {
        api_port: 0,
        request_timeout: Duration::from_secs(10),
        sqlite_path: None,
        ciphertext_store: ObjectStoreConfig::Memory,
        signing_key: Crypto::new(password_cost).new_signing_key(),
        password_cost,
        log_level: tracing::Level::DEBUG,
        log_dir: None,
    }
}

pub struct TestApp {
    pub state: ServiceState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        init_logging();
        let state = ServiceState::from_config(&test_config(), None)
            .await
            .unwrap();
        let router = http_server::router(state.clone());
        Self { state, router }
    }

    /// Send one request, returning the status and the JSON body (Null when empty).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    /// Register `handle` and log in, returning the bearer token.
    pub async fn user(&self, handle: &str) -> String {
        let (status, _) = self
            .send(
                Method::POST,
                "/api/v0/auth/register",
                None,
                Some(json!({ "handle": handle, "name": handle, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, session) = self
            .send(
                Method::POST,
                "/api/v0/auth/login",
                None,
                Some(json!({ "handle": handle, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        session["token"].as_str().unwrap().to_string()
    }

    pub async fn put_secret(&self, token: &str, key: &str, value: &str) {
        let (status, _) = self
            .send(
                Method::PUT,
                &format!("/api/v0/secrets/{key}"),
                Some(token),
                Some(json!({ "value": value })),
            )
            .await;
        assert!(status.is_success(), "put {key}: {status}");
    }
}
