use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;
use shared_utils::AppState;

use crate::handlers;

pub fn portal_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/access", post(handlers::portal_login))
        .route("/parents/{code}", get(handlers::parent_portal))
        .route("/student/{code}", get(handlers::student_portal))
        .route(
            "/student/{code}/tasks/{task_id}/complete",
            post(handlers::complete_student_task),
        );

    let protected_routes = Router::new()
        .route(
            "/patients/{patient_id}/access-codes",
            get(handlers::list_access_codes).post(handlers::generate_access_code),
        )
        .route(
            "/patients/{patient_id}/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route("/patients/{patient_id}/achievements", get(handlers::list_unlocked))
        .route(
            "/patients/{patient_id}/achievements/{achievement_id}",
            post(handlers::unlock_achievement),
        )
        .route("/tasks/{task_id}/complete", post(handlers::complete_task))
        .route("/achievements", get(handlers::list_achievements))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
