pub mod generate;
pub mod listing_caption;
pub mod listing_images;

use axum::body::Bytes;
use axum::extract::Multipart;
use axum::http::StatusCode;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::validators::{ImageUpload, resolve_mime};

/// One multipart field, fully buffered.
#[derive(Debug)]
pub struct FormPart {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FormPart {
    /// File parts carry a filename; plain text fields do not.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        self.file_name.is_some()
    }

    /// Empty text fields count as absent.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.is_file() || !self.data.is_empty()
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        if self.is_file() { "file" } else { "text" }
    }

    /// The part as an upload, if it is a file part.
    #[must_use]
    pub fn to_upload(&self) -> Option<ImageUpload> {
        let file_name = self.file_name.as_deref()?;
        let content_type = resolve_mime(self.content_type.as_deref(), Some(file_name));
        let file_name = if file_name.is_empty() {
            "upload"
        } else {
            file_name
        };
        Some(ImageUpload {
            file_name: file_name.to_string(),
            content_type,
            data: self.data.clone(),
        })
    }

    #[must_use]
    pub fn into_text(self) -> Option<String> {
        if self.is_file() {
            return None;
        }
        Some(String::from_utf8_lossy(&self.data).to_string())
    }
}

/// Buffers every field; the first occurrence of a name wins.
///
/// # Errors
///
/// Returns the multipart error's own status (400, 413) if the body is malformed or too large.
pub async fn read_parts(mut multipart: Multipart) -> AppResult<HashMap<String, FormPart>> {
    let mut parts = HashMap::new();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(ToString::to_string);
        let content_type = field.content_type().map(ToString::to_string);
        let data = field.bytes().await?;
        parts.entry(name).or_insert(FormPart {
            file_name,
            content_type,
            data,
        });
    }
    Ok(parts)
}

/// Size/type check mapped onto HTTP: wrong type is 400, oversize is 413.
///
/// # Errors
///
/// Returns the rejection as a JSON error.
pub fn check_upload(
    upload: &ImageUpload,
    max_bytes: usize,
    require_photo_type: bool,
) -> AppResult<()> {
    use crate::validators::Rejection;
    upload
        .validate(max_bytes, require_photo_type)
        .map_err(|rejection| {
            let code = match rejection {
                Rejection::UnsupportedType => StatusCode::BAD_REQUEST,
                Rejection::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            };
            tracing::info!(file = %upload.file_name, %rejection, "upload rejected");
            AppError::msg(code, rejection.to_string())
        })
}

/// Multipart part for forwarding; a malformed declared type is the client's fault.
///
/// # Errors
///
/// Returns 400 if the content type cannot be used as a MIME type.
pub fn forward_part(upload: &ImageUpload) -> AppResult<reqwest::multipart::Part> {
    upload.to_part().map_err(|e| {
        AppError::msg(
            StatusCode::BAD_REQUEST,
            format!("invalid content type {:?}: {e}", upload.content_type),
        )
    })
}
