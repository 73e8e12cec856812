use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde_json::{Value as JsonValue, json};

use crate::error::{AppError, AppResult};
use crate::models::AppState;
use crate::normalize::extract_caption;
use crate::proxy::{route_probe, webhook_error};

pub async fn probe() -> impl IntoResponse {
    route_probe("/api/listing/caption")
}

/// Forward listing details to the caption webhook and normalize its answer
/// to `{caption, raw}` when a caption can be found in it.
///
/// # Errors
///
/// 400 for a body that is not JSON, the webhook's own status when it rejects
/// the request, 502 when it cannot be reached.
pub async fn caption(State(state): State<AppState>, body: Bytes) -> AppResult<Response> {
    let payload: JsonValue = serde_json::from_slice(&body)?;

    let upstream = state
        .webhooks
        .listing_caption
        .post_json(&state.http, &payload)
        .await
        .map_err(|e| AppError::Upstream(format!("{e:#}")))?;

    if !upstream.status.is_success() {
        return Err(webhook_error(&upstream));
    }

    if !upstream.is_json() {
        let message = upstream.text_lossy();
        return Ok((upstream.status, Json(json!({ "message": message }))).into_response());
    }

    let data: JsonValue = serde_json::from_slice(&upstream.body)
        .map_err(|_| AppError::Upstream("Upstream returned invalid JSON".into()))?;

    let body = match extract_caption(&data) {
        Some(caption) => {
            tracing::debug!(chars = caption.chars().count(), "caption extracted");
            json!({ "caption": caption, "raw": data })
        }
        None => {
            tracing::warn!("no caption found in webhook response, relaying as-is");
            data
        }
    };
    Ok((upstream.status, Json(body)).into_response())
}
