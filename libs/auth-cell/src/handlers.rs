use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::{Credentials, SignUpRequest, TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::extractor::bearer_token;
use shared_utils::jwt::validate_token as validate_jwt;
use shared_utils::AppState;

use crate::services::AuthService;

pub async fn validate_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = bearer_token(&headers)?;
    let user = validate_jwt(&token, &config.supabase_jwt_secret).map_err(AppError::Auth)?;

    Ok(Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

pub async fn verify_token(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = bearer_token(&headers)?;
    let valid = validate_jwt(&token, &config.supabase_jwt_secret).is_ok();

    Ok(Json(json!({ "valid": valid })))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<Value>, AppError> {
    let service = AuthService::new(state.supabase.clone());
    let session = service.sign_in(&credentials.email, &credentials.password).await?;

    Ok(Json(json!({
        "access_token": session.access_token,
        "refresh_token": session.refresh_token,
        "expires_in": session.expires_in,
        "user": session.user,
    })))
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = AuthService::new(state.supabase.clone());
    let user = service
        .sign_up(&request.email, &request.password, &request.full_name)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

pub async fn sign_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let token = bearer_token(&headers)?;
    AuthService::new(state.supabase.clone()).sign_out(&token).await?;

    Ok(Json(json!({ "success": true })))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Getting profile for user: {}", user.id);

    let token = bearer_token(&headers)?;
    let profile = AuthService::new(state.supabase.clone())
        .fetch_profile(&user.id, &token)
        .await?;

    Ok(Json(json!({
        "user_id": user.id,
        "email": user.email,
        "role": user.role,
        "profile": profile,
    })))
}
