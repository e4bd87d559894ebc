// libs/appointment-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{
    AppointmentError, AppointmentQuery, AvailabilityQuery, AvailabilityResponse, BookingRequest,
    NewAppointment, RescheduleRequest, UpdateAppointmentRequest,
};
use crate::services::agenda::AgendaService;
use crate::services::availability::{weekday_index, AvailabilityService};
use crate::services::booking::PublicBookingService;
use crate::services::messaging;

#[derive(Debug, Deserialize)]
pub struct SiteBookingsQuery {
    pub psychologist_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let service = AvailabilityService::new(state.supabase.clone());

    let slots = service
        .get_available_slots(query.date, query.psychologist_id, None)
        .await?;

    let available = !slots.is_empty();
    let fallback_contact_url = (!available)
        .then(|| messaging::slot_inquiry(&state.config.clinic_whatsapp_number, query.date, None));

    Ok(Json(AvailabilityResponse {
        date: query.date,
        weekday: weekday_index(query.date),
        slots,
        available,
        fallback_contact_url,
    }))
}

/// Failures still carry a chat link so the visitor can finish the booking by hand.
#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<AppState>,
    Json(request): Json<BookingRequest>,
) -> Response {
    let service = PublicBookingService::new(&state.config, state.supabase.clone());
    let date = request.date;
    let slot = request.slot.clone();

    match service.book_slot(request).await {
        Ok(confirmation) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "appointment": confirmation.appointment,
                "whatsapp_url": confirmation.whatsapp_url,
            })),
        )
            .into_response(),
        Err(err) => {
            warn!("Site booking for {} {} failed: {}", date, slot, err);
            let error = AppError::from(err);
            let fallback = messaging::slot_inquiry(service.clinic_number(), date, Some(&slot));
            (
                error.status_code(),
                Json(json!({
                    "error": error.to_string(),
                    "fallback_contact_url": fallback,
                })),
            )
                .into_response()
        }
    }
}

// ==============================================================================
// AGENDA HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AppointmentQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AgendaService::new(state.supabase.clone());
    let appointments = service.list_appointments(&query, auth.token()).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<NewAppointment>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if request.psychologist_id.to_string() != user.id && user.role.as_deref() != Some("admin") {
        return Err(AppError::Auth("Not authorized to schedule for another psychologist".to_string()));
    }

    let service = AgendaService::new(state.supabase.clone());
    let appointment = service.create_appointment(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(appointment))))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AgendaService::new(state.supabase.clone());
    let appointment = service.get_appointment(appointment_id, auth.token()).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AgendaService::new(state.supabase.clone());
    let appointment = service
        .update_appointment(appointment_id, request, auth.token())
        .await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AgendaService::new(state.supabase.clone());
    service.delete_appointment(appointment_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Appointment deleted"
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AgendaService::new(state.supabase.clone());
    let appointment = service.confirm(appointment_id, auth.token()).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AgendaService::new(state.supabase.clone());
    let appointment = service.cancel(appointment_id, auth.token()).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AgendaService::new(state.supabase.clone());
    let appointment = service.complete(appointment_id, auth.token()).await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AgendaService::new(state.supabase.clone());
    let appointment = service
        .reschedule(appointment_id, request, auth.token())
        .await?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_site_bookings(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<SiteBookingsQuery>,
) -> Result<Json<Value>, AppError> {
    let from = query.from.unwrap_or_else(|| Utc::now().date_naive());
    let service = AgendaService::new(state.supabase.clone());
    let bookings = service
        .list_site_bookings(query.psychologist_id, from, auth.token())
        .await?;

    Ok(Json(json!({
        "bookings": bookings,
        "total": bookings.len(),
    })))
}

/// Link the clinic uses to confirm a site booking with the visitor.
#[axum::debug_handler]
pub async fn whatsapp_link(
    State(state): State<AppState>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AgendaService::new(state.supabase.clone());
    let appointment = service.get_appointment(appointment_id, auth.token()).await?;

    let (Some(name), Some(phone)) = (&appointment.patient_name_manual, &appointment.phone_manual) else {
        return Err(AppointmentError::ValidationError(
            "Appointment has no contact phone".to_string(),
        )
        .into());
    };

    let url = messaging::clinic_confirmation(phone, name, appointment.date, appointment.display_start());
    Ok(Json(json!({ "whatsapp_url": url })))
}
