use axum::extract::DefaultBodyLimit;
use axum::Router;
use crate::state::AppState;
use tower_http::trace::TraceLayer;

// Request bodies are a URL and a label. Enforced by the extractor so an
// oversized body is rejected with the usual JSON error.
const MAX_BODY_BYTES: usize = 16 * 1024;

pub fn create_app(state: AppState) -> Router {
    crate::routes::configure_routes()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
