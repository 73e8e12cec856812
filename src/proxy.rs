use axum::{
    Json,
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value as JsonValue, json};

use crate::error::{AppError, AppResult};
use crate::webhook::UpstreamResponse;

/// Re-emits an upstream answer with its status: JSON as JSON, anything else as raw bytes.
///
/// # Errors
///
/// Returns 502 if the upstream claims JSON but the body does not parse.
pub fn passthrough(upstream: UpstreamResponse) -> AppResult<Response> {
    if upstream.is_json() {
        let data: JsonValue = serde_json::from_slice(&upstream.body)
            .map_err(|_| AppError::Upstream("Upstream returned invalid JSON".into()))?;
        return Ok((upstream.status, Json(data)).into_response());
    }

    let content_type = upstream
        .content_type
        .as_deref()
        .filter(|ct| !ct.is_empty())
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let mut res = Response::new(Body::from(upstream.body));
    *res.status_mut() = upstream.status;
    res.headers_mut().insert(header::CONTENT_TYPE, content_type);
    Ok(res)
}

/// Error for a non-2xx webhook answer; keeps the upstream status.
#[must_use]
pub fn webhook_error(upstream: &UpstreamResponse) -> AppError {
    let text = upstream.text_lossy();
    let text = if text.is_empty() {
        upstream
            .status
            .canonical_reason()
            .unwrap_or_default()
            .to_string()
    } else {
        text
    };
    tracing::warn!(status = %upstream.status, body = %text, "webhook returned an error");
    AppError::Msg(
        upstream.status,
        format!("Webhook error: {} {text}", upstream.status.as_u16()),
    )
}

/// `GET` probe body for the listing endpoints.
pub fn route_probe(route: &'static str) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "ok": true, "route": route, "method": "GET" })),
    )
}
