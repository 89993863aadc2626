//! HTTP route handlers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use chrono::Utc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{AppState, ReceivedRequest};

const ALLOW_METHODS: &str = "POST, GET, OPTIONS";
const ALLOW_HEADERS: &str = "access-control-allow-headers, content-type";

/// Create the router; every method and path is handled by [`ingest`]
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(ingest)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Accept one delivery, log it and answer per the failure policy
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let caller = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .or_else(|| peer.map(|ConnectInfo(addr)| addr.to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    let body = String::from_utf8_lossy(&body).into_owned();
    tracing::info!("{} from {}: '{}'", method, caller, body);

    let (status, text) = if state.next_should_fail() {
        (StatusCode::BAD_REQUEST, "Bad request")
    } else {
        (StatusCode::OK, "OK")
    };

    state.record(ReceivedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        caller,
        body,
        status: status.as_u16(),
        received_at: Utc::now(),
    });

    (
        status,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
        ],
        text,
    )
        .into_response()
}
