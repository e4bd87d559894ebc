use axum::{middleware, routing::get, Router};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn clinical_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/patients/{patient_id}/evolutions",
            get(handlers::list_evolutions).post(handlers::create_evolution),
        )
        .route(
            "/patients/{patient_id}/evolutions/latest-objective",
            get(handlers::latest_objective),
        )
        .route(
            "/patients/{patient_id}/diagnostics",
            get(handlers::list_diagnostics).post(handlers::create_diagnostic),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
