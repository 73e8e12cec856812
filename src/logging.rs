use crate::config::Config;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{HeaderMap, Request, Response, StatusCode, header};
use axum::middleware::Next;
use axum::response::IntoResponse;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const PREVIEW_BYTES: usize = 16 * 1024;
/// Request bodies larger than this are not buffered for logging.
const MAX_LOGGED_REQUEST: usize = 1024 * 1024;

/// Keep guards alive for the lifetime of the app.
pub struct LogGuards {
    _file_guard: Option<WorkerGuard>,
}

fn split_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let file = path
        .file_name()
        .unwrap_or_else(|| OsStr::new("corretoria.log"))
        .to_string_lossy()
        .to_string();
    (dir, file)
}

pub fn init_logging(config: &Config) -> LogGuards {
    let filter = EnvFilter::new(config.log_filter());

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_ansi(true)
        .compact()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S".to_string(),
        ));

    // Optional file layer (ANSI disabled)
    let (file_layer, guard) = config.log_file.as_deref().map_or((None, None), |path| {
        let (dir, file) = split_path(path);
        let appender = tracing_appender::rolling::never(dir, file);
        let (nb, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .compact()
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
                "%Y-%m-%d %H:%M:%S".to_string(),
            ))
            .with_writer(nb);

        (Some(layer), Some(guard))
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer);

    if let Some(file_layer) = file_layer {
        subscriber.with(file_layer).init();
    } else {
        subscriber.init();
    }

    LogGuards { _file_guard: guard }
}

fn preview(bytes: &[u8]) -> String {
    if bytes.len() > PREVIEW_BYTES {
        format!(
            "{}… [truncated]",
            String::from_utf8_lossy(&bytes[..PREVIEW_BYTES])
        )
    } else {
        String::from_utf8_lossy(bytes).to_string()
    }
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Logs request & response bodies.
/// Skips multipart requests and binary responses, truncates previews.
pub async fn log_payloads(req: Request<Body>, next: Next) -> Response<Body> {
    let req_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let req_ct = content_type(req.headers());

    let (req_parts, req_body) = req.into_parts();
    let req = if req_ct.starts_with("multipart/") {
        Request::from_parts(req_parts, req_body)
    } else {
        match axum::body::to_bytes(req_body, MAX_LOGGED_REQUEST).await {
            Ok(bytes) => {
                if !bytes.is_empty() {
                    tracing::info!(request_id=%req_id, request_body=%preview(&bytes), "request body");
                }
                Request::from_parts(req_parts, Body::from(bytes))
            }
            Err(e) => {
                tracing::warn!(request_id=%req_id, error=%e, "failed reading request body");
                return StatusCode::PAYLOAD_TOO_LARGE.into_response();
            }
        }
    };

    let res: Response<Body> = next.run(req).await;

    let res_ct = content_type(res.headers());
    let (res_parts, res_body) = res.into_parts();
    if res_ct.starts_with("image/") || res_ct.starts_with("application/octet-stream") {
        return Response::from_parts(res_parts, res_body);
    }
    match axum::body::to_bytes(res_body, usize::MAX).await {
        Ok(bytes) => {
            tracing::info!(request_id=%req_id, response_body=%preview(&bytes), "response body");
            Response::from_parts(res_parts, Body::from(bytes))
        }
        Err(e) => {
            tracing::warn!(request_id=%req_id, error=%e, "failed reading response body");
            Response::from_parts(res_parts, Body::empty())
        }
    }
}
