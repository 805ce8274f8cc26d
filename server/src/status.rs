use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use crate::state::RegistrySnapshot;

/// Read-only HTTP view of connected boards and their neighbors.
pub fn status_router(snapshot_rx: watch::Receiver<RegistrySnapshot>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .with_state(snapshot_rx)
}

async fn status_handler(
    State(snapshot_rx): State<watch::Receiver<RegistrySnapshot>>,
) -> Json<RegistrySnapshot> {
    let snapshot = snapshot_rx.borrow().clone();
    Json(snapshot)
}
