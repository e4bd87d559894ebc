use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use clinical_cell::clinical_routes;
use finance_cell::finance_routes;
use monitoring_cell::{monitoring_routes, ConnectivityMonitor};
use patient_cell::patient_routes;
use portal_cell::portal_routes;
use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::dashboard;

pub fn create_router(state: AppState, monitor: Arc<ConnectivityMonitor>) -> Router {
    let dashboard_routes = Router::new()
        .route("/", get(dashboard::get_dashboard))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state.clone());

    Router::new()
        .route("/", get(|| async { "Bloom Clinic API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/clinical", clinical_routes(state.clone()))
        .nest("/portal", portal_routes(state.clone()))
        .nest("/finance", finance_routes(state))
        .nest("/monitoring", monitoring_routes(monitor))
        .nest("/dashboard", dashboard_routes)
}
