#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::Response,
    routing::any,
};
use clap::Parser;
use tokio::sync::Mutex;

use corretoria::config::{Cli, Config};

/// What a mocked webhook saw.
#[derive(Clone, Debug)]
pub struct Received {
    pub hook: String,
    pub auth: Option<String>,
    pub content_type: String,
    pub body: Bytes,
}

impl Received {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

#[derive(Clone)]
pub struct Canned {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
}

#[derive(Clone, Default)]
struct MockState {
    received: Arc<Mutex<Vec<Received>>>,
    replies: Arc<Mutex<HashMap<String, Canned>>>,
}

/// Minimal HTTP server standing in for the automation webhooks.
/// Every path `/{hook}` records the request and answers with its canned reply.
pub struct MockWebhooks {
    port: u16,
    state: MockState,
}

async fn handle(
    State(state): State<MockState>,
    Path(hook): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    state.received.lock().await.push(Received {
        hook: hook.clone(),
        auth: header_str(header::AUTHORIZATION),
        content_type: header_str(header::CONTENT_TYPE).unwrap_or_default(),
        body,
    });

    let canned = state.replies.lock().await.get(&hook).cloned().unwrap_or(Canned {
        status: StatusCode::OK,
        content_type: Some("application/json".into()),
        body: Bytes::from_static(br#"{"ok":true}"#),
    });

    let mut res = Response::new(Body::from(canned.body));
    *res.status_mut() = canned.status;
    if let Some(ct) = canned.content_type {
        res.headers_mut()
            .insert(header::CONTENT_TYPE, ct.parse().unwrap());
    }
    res
}

impl MockWebhooks {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/{hook}", any(handle))
            .with_state(state.clone())
            .layer(DefaultBodyLimit::disable());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock webhooks");
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(axum::serve(listener, app).into_future());

        Self { port, state }
    }

    pub fn url(&self, hook: &str) -> String {
        format!("http://127.0.0.1:{}/{hook}", self.port)
    }

    pub async fn reply(
        &self,
        hook: &str,
        status: u16,
        content_type: Option<&str>,
        body: impl Into<Bytes>,
    ) {
        self.state.replies.lock().await.insert(
            hook.to_string(),
            Canned {
                status: StatusCode::from_u16(status).unwrap(),
                content_type: content_type.map(ToString::to_string),
                body: body.into(),
            },
        );
    }

    pub async fn received(&self) -> Vec<Received> {
        self.state.received.lock().await.clone()
    }
}

pub const TEST_USER: &str = "generation";
pub const TEST_PASS: &str = "s3cret";

/// Config pointing all three webhooks at the mock.
/// `extra` flags (as `--name=value`) replace any default of the same name.
pub fn test_config(mock: &MockWebhooks, with_auth: bool, extra: &[&str]) -> Config {
    let mut args = vec![
        "corretoria".to_string(),
        format!("--portrait-webhook-url={}", mock.url("portrait")),
        format!("--listing-images-webhook-url={}", mock.url("images")),
        format!("--listing-caption-webhook-url={}", mock.url("caption")),
    ];
    if with_auth {
        args.push(format!("--webhook-user={TEST_USER}"));
        args.push(format!("--webhook-pass={TEST_PASS}"));
    } else {
        args.push("--webhook-user=".into());
        args.push("--webhook-pass=".into());
    }
    let flag = |a: &str| a.split('=').next().unwrap_or_default().to_string();
    let overridden: Vec<String> = extra.iter().map(|a| flag(a)).collect();
    args.retain(|a| !overridden.contains(&flag(a)));
    args.extend(extra.iter().map(ToString::to_string));
    Cli::parse_from(args).config
}

/// A port nothing listens on.
pub fn dead_url() -> String {
    let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = l.local_addr().unwrap().port();
    drop(l);
    format!("http://127.0.0.1:{port}/gone")
}

pub struct FormField<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> FormField<'a> {
    pub const fn file(
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    ) -> Self {
        Self {
            name,
            file_name: Some(file_name),
            content_type: Some(content_type),
            data,
        }
    }

    pub const fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

const BOUNDARY: &str = "corretoria-test-boundary";

/// Hand-built multipart/form-data body: (content-type header, body).
pub fn multipart(parts: &[FormField<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for p in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match p.file_name {
            Some(f) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{f}\"\r\n",
                p.name
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", p.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        if let Some(ct) = p.content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(p.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
