use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{get_health, get_status, probe_now};
use crate::services::ConnectivityMonitor;

pub fn monitoring_routes(monitor: Arc<ConnectivityMonitor>) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/status", get(get_status))
        .route("/status/probe", post(probe_now))
        .with_state(monitor)
}
