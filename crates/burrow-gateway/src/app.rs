use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::dispatch::dispatch;
use crate::state::AppState;

/// Default upper bound of a request body: 25 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 25 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Self::router_with_body_limit(state, DEFAULT_BODY_LIMIT)
    }

    pub fn router_with_body_limit(state: AppState, body_limit: usize) -> Router {
        Router::new()
            .route("/_health", get(health_handler).fallback(dispatch))
            .fallback(dispatch)
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(CatchPanicLayer::new())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
