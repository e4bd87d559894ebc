// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::BackendError;
use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub psychologist_id: Uuid,
    #[serde(default)]
    pub patient_id: Option<Uuid>,
    #[serde(default)]
    pub patient_name_manual: Option<String>,
    #[serde(default)]
    pub phone_manual: Option<String>,
    pub date: NaiveDate,
    /// `HH:MM` or `HH:MM:SS`, as stored by the backend.
    pub start_time: String,
    pub end_time: String,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub session_type: SessionType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Booked without a patient record, through the public site.
    pub fn is_walk_in(&self) -> bool {
        self.patient_id.is_none() && self.patient_name_manual.is_some()
    }

    pub fn occupies_slot(&self, slot_label: &str) -> bool {
        self.start_time.starts_with(slot_label)
    }

    pub fn display_start(&self) -> &str {
        self.start_time.get(..5).unwrap_or(&self.start_time)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    #[serde(rename = "agendado")]
    Scheduled,
    #[serde(rename = "confirmado")]
    Confirmed,
    #[serde(rename = "cancelado")]
    Canceled,
    #[serde(rename = "realizado")]
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "agendado",
            AppointmentStatus::Confirmed => "confirmado",
            AppointmentStatus::Canceled => "cancelado",
            AppointmentStatus::Completed => "realizado",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SessionType {
    #[default]
    #[serde(rename = "individual")]
    Individual,
    #[serde(rename = "grupo")]
    Group,
    #[serde(rename = "avaliacao")]
    Assessment,
    #[serde(rename = "devolutiva")]
    Feedback,
    #[serde(rename = "supervisao")]
    Supervision,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Row inserted into the agenda, by the clinician or the public site.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub psychologist_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name_manual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_manual: Option<String>,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_status")]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub session_type: SessionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

fn default_status() -> AppointmentStatus {
    AppointmentStatus::Scheduled
}

impl NewAppointment {
    pub fn validate(&self) -> Result<(), AppointmentError> {
        validate_time_range(&self.start_time, &self.end_time)?;

        match (&self.patient_id, &self.patient_name_manual) {
            (None, None) => Err(AppointmentError::ValidationError(
                "Either a patient or a contact name is required".to_string(),
            )),
            (None, Some(name)) if name.trim().is_empty() => Err(AppointmentError::ValidationError(
                "Contact name cannot be blank".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name_manual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_manual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_type: Option<SessionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub psychologist_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub psychologist_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    pub weekday: u8,
    pub slots: Vec<String>,
    pub available: bool,
    /// Present when nothing is bookable, so the caller can offer a chat instead.
    pub fallback_contact_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub psychologist_id: Uuid,
    pub date: NaiveDate,
    pub slot: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub appointment: Appointment,
    pub whatsapp_url: String,
}

// ==============================================================================
// TIME HELPERS
// ==============================================================================

pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

pub fn validate_time_range(start: &str, end: &str) -> Result<(), AppointmentError> {
    let start_time = parse_clock(start)
        .ok_or_else(|| AppointmentError::InvalidTime(format!("Invalid start time: {}", start)))?;
    let end_time = parse_clock(end)
        .ok_or_else(|| AppointmentError::InvalidTime(format!("Invalid end time: {}", end)))?;

    if start_time >= end_time {
        return Err(AppointmentError::InvalidTime(
            "Start time must be before end time".to_string(),
        ));
    }
    Ok(())
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment slot not available")]
    SlotNotAvailable,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Cannot change appointment from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotNotAvailable => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidStatusTransition { .. } => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidTime(_) | AppointmentError::ValidationError(_) => {
                AppError::ValidationError(err.to_string())
            }
            AppointmentError::Backend(BackendError::NoRows) => {
                AppError::NotFound("Appointment not found".to_string())
            }
            AppointmentError::Backend(backend) => backend.into(),
        }
    }
}
