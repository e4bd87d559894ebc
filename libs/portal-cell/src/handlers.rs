use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{CreateTaskRequest, GenerateAccessCodeRequest, PortalError, PortalLoginRequest};
use crate::services::{AccessService, AchievementService, PortalViewService, TaskService};

// Code-based portal, no account

#[axum::debug_handler]
pub async fn portal_login(
    State(state): State<AppState>,
    Json(request): Json<PortalLoginRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AccessService::new(state.supabase.clone());
    let access = service
        .validate_access_code(&request.code)
        .await?
        .ok_or(PortalError::NotFound)?;

    let patient = access.patient.as_ref().ok_or_else(|| {
        AppError::NotFound("Patient data not found for this code".to_string())
    })?;

    Ok(Json(json!({
        "access_code": access.access_code,
        "portal_type": access.portal_type,
        "patient_name": patient.patient.name,
    })))
}

#[axum::debug_handler]
pub async fn parent_portal(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let view = PortalViewService::new(state.supabase.clone())
        .parent_view(&code)
        .await?;

    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn student_portal(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let view = PortalViewService::new(state.supabase.clone())
        .student_view(&code)
        .await?;

    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn complete_student_task(
    State(state): State<AppState>,
    Path((code, task_id)): Path<(String, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let (task, patient) = PortalViewService::new(state.supabase.clone())
        .complete_student_task(&code, task_id)
        .await?;
    let (coins, xp) = task.rewards();

    Ok(Json(json!({
        "task": task,
        "reward": { "coins": coins, "xp": xp },
        "patient": {
            "coins": patient.coins,
            "xp": patient.xp,
            "level": patient.level
        }
    })))
}

// Clinician management

#[axum::debug_handler]
pub async fn list_access_codes(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AccessService::new(state.supabase.clone());
    let codes = service.list_access_codes(patient_id, auth.token()).await?;

    Ok(Json(json!({
        "access_codes": codes,
        "total": codes.len()
    })))
}

#[axum::debug_handler]
pub async fn generate_access_code(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<GenerateAccessCodeRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AccessService::new(state.supabase.clone());
    let access = service
        .generate_access_code(patient_id, request.portal_type, auth.token())
        .await?;

    Ok((StatusCode::CREATED, Json(json!(access))))
}

#[axum::debug_handler]
pub async fn list_tasks(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = TaskService::new(state.supabase.clone());
    let tasks = service.list_tasks(patient_id, Some(auth.token())).await?;

    Ok(Json(json!({
        "tasks": tasks,
        "total": tasks.len()
    })))
}

#[axum::debug_handler]
pub async fn create_task(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
    Json(mut request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    request.patient_id = patient_id;

    let service = TaskService::new(state.supabase.clone());
    let task = service.create_task(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(task))))
}

#[axum::debug_handler]
pub async fn complete_task(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = TaskService::new(state.supabase.clone());
    let task = service.get_task(task_id, Some(auth.token())).await?;
    let (task, patient) = service.complete_task(task, Some(auth.token())).await?;

    Ok(Json(json!({
        "task": task,
        "patient": patient
    })))
}

#[axum::debug_handler]
pub async fn list_achievements(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AchievementService::new(state.supabase.clone());
    let achievements = service.list_achievements(Some(auth.token())).await?;

    Ok(Json(json!({ "achievements": achievements })))
}

#[axum::debug_handler]
pub async fn list_unlocked(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AchievementService::new(state.supabase.clone());
    let unlocked = service.list_unlocked(patient_id, Some(auth.token())).await?;

    Ok(Json(json!({ "achievements": unlocked })))
}

#[axum::debug_handler]
pub async fn unlock_achievement(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path((patient_id, achievement_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AchievementService::new(state.supabase.clone());

    match service.unlock(patient_id, achievement_id, auth.token()).await? {
        Some(unlocked) => Ok((
            StatusCode::CREATED,
            Json(json!({ "unlocked": true, "achievement": unlocked })),
        )),
        None => Ok((StatusCode::OK, Json(json!({ "unlocked": false })))),
    }
}
