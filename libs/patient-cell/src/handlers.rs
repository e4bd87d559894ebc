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

use crate::models::{CreatePatientRequest, PatientQuery, RewardRequest, UpdatePatientRequest};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<PatientQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(state.supabase.clone());
    let patients = service.list_patients(&query, auth.token()).await?;

    Ok(Json(json!({
        "patients": patients,
        "total": patients.len()
    })))
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(mut request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if request.psychologist_id.is_none() {
        request.psychologist_id = Uuid::parse_str(&user.id).ok();
    }

    let service = PatientService::new(state.supabase.clone());
    let patient = service.create_patient(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(patient))))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(state.supabase.clone());
    let patient = service.get_patient(patient_id, Some(auth.token())).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(state.supabase.clone());
    let patient = service.update_patient(patient_id, request, auth.token()).await?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn add_rewards(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<RewardRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(state.supabase.clone());
    let patient = service
        .add_rewards(patient_id, request.coins, request.xp, Some(auth.token()))
        .await?;

    Ok(Json(json!({
        "coins": patient.coins,
        "xp": patient.xp,
        "level": patient.level,
    })))
}
