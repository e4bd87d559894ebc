use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{CreateDiagnosticRequest, CreateEvolutionRequest, DiagnosticQuery};
use crate::services::{DiagnosticService, EvolutionService};

#[axum::debug_handler]
pub async fn list_evolutions(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = EvolutionService::new(state.supabase.clone());
    let evolutions = service.list_evolutions(patient_id, Some(auth.token())).await?;

    Ok(Json(json!({
        "evolutions": evolutions,
        "total": evolutions.len()
    })))
}

#[axum::debug_handler]
pub async fn latest_objective(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = EvolutionService::new(state.supabase.clone());
    let objective = service.latest_objective(patient_id, auth.token()).await?;

    Ok(Json(json!({ "objective": objective })))
}

#[axum::debug_handler]
pub async fn create_evolution(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(mut request): Json<CreateEvolutionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    request.patient_id = patient_id;
    if request.psychologist_id.is_none() {
        request.psychologist_id = Uuid::parse_str(&user.id).ok();
    }

    let service = EvolutionService::new(state.supabase.clone());
    let evolution = service.create_evolution(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(evolution))))
}

#[axum::debug_handler]
pub async fn list_diagnostics(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<DiagnosticQuery>,
) -> Result<Json<Value>, AppError> {
    let service = DiagnosticService::new(state.supabase.clone());
    let diagnostics = service
        .list_diagnostics(patient_id, query.parents_only, Some(auth.token()))
        .await?;

    Ok(Json(json!({
        "diagnostics": diagnostics,
        "total": diagnostics.len()
    })))
}

#[axum::debug_handler]
pub async fn create_diagnostic(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
    Json(mut request): Json<CreateDiagnosticRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    request.patient_id = patient_id;

    let service = DiagnosticService::new(state.supabase.clone());
    let diagnostic = service.create_diagnostic(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(diagnostic))))
}
