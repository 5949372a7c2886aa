//! JSON snapshot endpoint.

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::state::AppState;

/// Creates the web router serving the snapshot at the configured endpoint.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(state.endpoint(), get(temperatures))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET <endpoint> - Current temperatures as indented JSON
async fn temperatures(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let records = match state.temperatures().await {
        Ok(records) => records,
        Err(failure) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "Error updating temperature for {}: {}",
                    failure.path, failure.error
                ),
            )
                .into_response();
        }
    };

    let body = match serde_json::to_string_pretty(records.as_slice()) {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to serialize temperatures: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error formatting JSON").into_response();
        }
    };

    let client = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.to_string()))
        .unwrap_or_else(|| "unknown".to_string());
    info!(
        "FROM {}: {} [cache: {}]",
        client,
        uri.path(),
        state.cache_time()
    );

    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}
