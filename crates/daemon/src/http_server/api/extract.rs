//! Request extractors. The access control gate runs here, before any handler
//! body.

use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use common::context::Context;
use common::error::VaultError;
use common::gate::Caller;

use super::ApiError;
use crate::ServiceState;

/// The raw bearer token of the request.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| VaultError::Unauthorized("missing bearer token".into()))?;
        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| VaultError::Unauthorized("malformed authorization header".into()))?;
        Ok(BearerToken(token.to_string()))
    }
}

/// A caller whose token the gate accepted.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Caller);

#[async_trait]
impl FromRequestParts<ServiceState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let caller = state.vault().authenticate(&token)?;
        Ok(Authenticated(caller))
    }
}

/// The per-request [`Context`].
#[derive(Debug, Clone)]
pub struct RequestContext(pub Context);

#[async_trait]
impl FromRequestParts<ServiceState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        Ok(RequestContext(state.request_context()))
    }
}
