use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Response;

use crate::error::{AppError, AppResult};
use crate::models::AppState;
use crate::proxy::passthrough;
use crate::routes::{FormPart, check_upload, forward_part, read_parts};

/// Forward a photo to the portrait webhook and relay whatever it answers.
///
/// Accepts a multipart form with a `file` part and an optional `feedback` text.
///
/// # Errors
///
/// 400 when `file` is missing or not an accepted image, 413 when too large,
/// 502 when the webhook cannot be reached.
pub async fn generate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Response> {
    let mut parts = read_parts(multipart).await?;

    let Some(photo) = parts.get("file").and_then(FormPart::to_upload) else {
        return Err(AppError::msg(StatusCode::BAD_REQUEST, "Missing file"));
    };
    check_upload(&photo, state.config.max_portrait_bytes, true)?;

    let feedback = parts
        .remove("feedback")
        .and_then(FormPart::into_text)
        .filter(|f| !f.trim().is_empty());

    let mut form = reqwest::multipart::Form::new().part("file", forward_part(&photo)?);
    if let Some(feedback) = feedback {
        form = form.text("feedback", feedback);
    }

    tracing::info!(
        file = %photo.file_name,
        content_type = %photo.content_type,
        bytes = photo.data.len(),
        "forwarding portrait request"
    );

    let upstream = state
        .webhooks
        .portrait
        .post_multipart(&state.http, form)
        .await
        .map_err(|e| {
            tracing::error!("{e:#}");
            AppError::Upstream("Upstream error".into())
        })?;

    passthrough(upstream)
}
