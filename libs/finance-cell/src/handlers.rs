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

use crate::models::{CreateTransactionRequest, TransactionQuery};
use crate::services::{summarize, FinanceService};

#[axum::debug_handler]
pub async fn list_transactions(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Value>, AppError> {
    let service = FinanceService::new(state.supabase.clone());
    let transactions = service.list_transactions(&query, auth.token()).await?;
    let summary = summarize(&transactions);

    Ok(Json(json!({
        "transactions": transactions,
        "summary": summary
    })))
}

#[axum::debug_handler]
pub async fn create_transaction(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(mut request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if request.psychologist_id.is_none() {
        request.psychologist_id = Uuid::parse_str(&user.id).ok();
    }

    let service = FinanceService::new(state.supabase.clone());
    let transaction = service.create_transaction(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(transaction))))
}

#[axum::debug_handler]
pub async fn delete_transaction(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(transaction_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let service = FinanceService::new(state.supabase.clone());
    service.delete_transaction(transaction_id, auth.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn get_summary(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Value>, AppError> {
    let service = FinanceService::new(state.supabase.clone());
    let summary = service.summary(&query, auth.token()).await?;

    Ok(Json(json!(summary)))
}
