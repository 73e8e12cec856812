use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::AppState;
use crate::proxy::{passthrough, route_probe, webhook_error};
use crate::routes::{FormPart, check_upload, forward_part, read_parts};

pub async fn probe() -> impl IntoResponse {
    route_probe("/api/listing/images")
}

/// Forward the listing photo and the chosen portrait to the composite-image webhook.
///
/// # Errors
///
/// 400 when a part is missing or is not a file, 500 when webhook auth is not
/// configured, the webhook's own status when it rejects the request.
pub async fn compose(State(state): State<AppState>, multipart: Multipart) -> AppResult<Response> {
    let mut parts = read_parts(multipart).await?;

    let listing = parts.remove("listingImage").filter(FormPart::is_present);
    let portrait = parts.remove("portraitImage").filter(FormPart::is_present);

    let (Some(listing), Some(portrait)) = (listing.as_ref(), portrait.as_ref()) else {
        return Err(AppError::Json(
            StatusCode::BAD_REQUEST,
            json!({
                "error": "Missing images",
                "received": {
                    "listingImage": listing.is_some(),
                    "portraitImage": portrait.is_some(),
                }
            }),
        ));
    };
    let types = json!({
        "listingImage": listing.kind(),
        "portraitImage": portrait.kind(),
    });

    let (Some(listing), Some(portrait)) = (listing.to_upload(), portrait.to_upload()) else {
        return Err(AppError::Json(
            StatusCode::BAD_REQUEST,
            json!({ "error": "Invalid image format", "types": types }),
        ));
    };

    let max = state.config.max_listing_photo_bytes;
    check_upload(&listing, max, true)?;
    check_upload(&portrait, max, false)?;

    let hook = &state.webhooks.listing_images;
    if hook.auth.is_none() {
        return Err(AppError::msg(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Auth not configured",
        ));
    }

    let form = reqwest::multipart::Form::new()
        .part("listingImage", forward_part(&listing)?)
        .part("portraitImage", forward_part(&portrait)?);

    tracing::info!(
        listing_bytes = listing.data.len(),
        portrait_bytes = portrait.data.len(),
        "forwarding listing images"
    );

    let upstream = hook
        .post_multipart(&state.http, form)
        .await
        .map_err(|e| AppError::Upstream(format!("{e:#}")))?;

    if !upstream.status.is_success() {
        return Err(webhook_error(&upstream));
    }
    passthrough(upstream)
}
