mod health;
mod metrics;
mod solve;

use {
    crate::observability::DropCounters,
    axum::{
        routing::{get, post},
        Router,
    },
    std::{sync::Arc, time::Duration},
    tower_http::trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub driver: Arc<solver_core::Driver>,
    pub deadline: Duration,
    pub drop_counters: DropCounters,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/solve", post(solve::solve))
        .route("/health", get(health::health))
        .route("/metrics", get(metrics::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
