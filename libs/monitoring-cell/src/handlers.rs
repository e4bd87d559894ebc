use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;

use crate::models::{ConnectivityStatus, HealthResponse};
use crate::services::ConnectivityMonitor;

/// Last recorded probe. Does not touch the backend.
pub async fn get_status(State(monitor): State<Arc<ConnectivityMonitor>>) -> Json<ConnectivityStatus> {
    Json(monitor.status().await)
}

/// Probes right away instead of waiting for the next tick.
pub async fn probe_now(State(monitor): State<Arc<ConnectivityMonitor>>) -> Json<ConnectivityStatus> {
    Json(monitor.probe().await)
}

pub async fn get_health(State(monitor): State<Arc<ConnectivityMonitor>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: monitor.uptime().as_secs(),
        timestamp: Utc::now(),
    })
}
