use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value as JsonValue;

#[derive(Debug)]
pub enum AppError {
    /// Status code with a `{"error": msg}` body.
    Msg(StatusCode, String),
    /// Status code with an arbitrary JSON body (diagnostics).
    Json(StatusCode, JsonValue),
    /// Webhook unreachable or unusable -> 502; logged.
    Upstream(String),
}

impl AppError {
    pub fn msg(code: StatusCode, msg: impl Into<String>) -> Self {
        Self::Msg(code, msg.into())
    }
}

/* ---- Narrow, explicit conversions so `?` works everywhere ---- */

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        Self::Msg(e.status(), e.body_text())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        Self::Msg(StatusCode::BAD_REQUEST, format!("invalid JSON: {e}"))
    }
}

#[derive(Serialize)]
struct ErrBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::Msg(code, error) => (code, Json(ErrBody { error })).into_response(),
            Self::Json(code, body) => (code, Json(body)).into_response(),
            Self::Upstream(error) => {
                tracing::warn!(%error, "upstream failure");
                (StatusCode::BAD_GATEWAY, Json(ErrBody { error })).into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
