// GET handlers: version, metrics

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use super::AppState;
use crate::exposition::CONTENT_TYPE;
use crate::version::{NAME, VERSION};

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /metrics: latest pass of every collector in Prometheus text format.
pub(super) async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.render().await {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body),
        Err(e) => {
            tracing::warn!(error = %e, operation = "render_metrics", "metric rendering failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                e.to_string(),
            )
        }
    }
}
