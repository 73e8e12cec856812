use crate::{
    logging::log_payloads,
    models::AppState,
    routes::{generate, listing_caption, listing_images},
};

use axum::body::Body;
use axum::extract::{ConnectInfo, DefaultBodyLimit};
use axum::http::{HeaderValue, Request, Response};
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::time::Duration;

use tower::ServiceBuilder;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info_span};

async fn healthz() -> Json<&'static str> {
    Json("ok")
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.and_then(|o| HeaderValue::from_str(o).ok()) {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}

pub fn build_app(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            let client_ip = req
                .extensions()
                .get::<ConnectInfo<std::net::SocketAddr>>()
                .map_or_else(|| "-".into(), |ci| ci.0.to_string());
            let rid = req
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");

            info_span!("http", method=%req.method(), uri=%req.uri(), client_ip=%client_ip, request_id=%rid)
        })
        .on_request(|_req: &Request<Body>, _span: &Span| {
            tracing::info!("request started");
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &Span| {
            tracing::info!(status=%res.status(), latency_ms=%latency.as_millis(), "response completed");
        })
        .on_failure(|_class: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
            tracing::error!(latency_ms=%latency.as_millis(), "request failed");
        });

    // Request-ID middleware comes first so everything downstream
    // has access to the x-request-id header.
    let request_id_layer = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id());

    let body_limit = state.config.body_limit();
    let cors = cors_layer(state.config.cors_origin.as_deref());

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/generate", post(generate::generate))
        .route(
            "/api/listing/images",
            get(listing_images::probe).post(listing_images::compose),
        )
        .route(
            "/api/listing/caption",
            get(listing_caption::probe).post(listing_caption::caption),
        )
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(log_payloads))
        .layer(trace)
        .layer(request_id_layer)
        .layer(cors)
}
