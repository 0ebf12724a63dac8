use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Unknown routes answer in the same `{kind, msg}` shape as API errors.
pub async fn not_found_handler(method: Method, uri: Uri) -> Response {
    tracing::debug!(%method, %uri, "no route");
    let body = serde_json::json!({
        "kind": "not_found",
        "msg": format!("no route for {method} {}", uri.path()),
    });
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
