use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use common::error::VaultError;
use common::share::{Expiry, ShareRequest};
use common::validation::SHARE_DURATION_MAX;

use crate::http_server::api::{ApiError, Authenticated, RequestContext};
use crate::ServiceState;

/// Wire form of [`Expiry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpiryBody {
    #[default]
    Default,
    For {
        seconds: i64,
    },
    Until {
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
    Never,
}

impl TryFrom<ExpiryBody> for Expiry {
    type Error = VaultError;

    fn try_from(body: ExpiryBody) -> Result<Self, Self::Error> {
        Ok(match body {
            ExpiryBody::Default => Expiry::Default,
            ExpiryBody::For { seconds } if seconds > SHARE_DURATION_MAX.whole_seconds() => {
                return Err(VaultError::InvalidInput(format!(
                    "expiry may be at most {} seconds",
                    SHARE_DURATION_MAX.whole_seconds()
                )));
            }
            ExpiryBody::For { seconds } => Expiry::For(Duration::seconds(seconds)),
            ExpiryBody::Until { at } => Expiry::Until(at),
            ExpiryBody::Never => Expiry::Never,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShareRequest {
    pub key: String,
    pub targets: Vec<String>,
    #[serde(default)]
    pub expiry: ExpiryBody,
}

pub async fn handler(
    State(state): State<ServiceState>,
    RequestContext(ctx): RequestContext,
    Authenticated(caller): Authenticated,
    Json(req): Json<CreateShareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let expiry = Expiry::try_from(req.expiry)?;
    let request = ShareRequest::new(req.key, req.targets).expiring(expiry);
    let share = state.vault().create_share(&ctx, &caller, request).await?;
    Ok((StatusCode::CREATED, Json(share)))
}
