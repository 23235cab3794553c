use axum::Router;
use axum::routing::post;
use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod naming;
pub mod parser;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/formats", post(handler::formats))
        .route("/download", post(handler::download))
}
