// HTTP routes

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::exposition::MetricStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<MetricStore>,
}

pub fn app(store: Arc<MetricStore>) -> Router {
    let state = AppState { store };
    Router::new()
        .route("/", get(|| async { "devstat exporter: metrics at /metrics" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/metrics", get(http::metrics_handler)) // GET /metrics
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
