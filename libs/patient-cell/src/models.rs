use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::BackendError;
use shared_models::error::AppError;

pub const DEFAULT_SESSION_FREQUENCY: &str = "semanal";
pub const ACTIVE_STATUS: &str = "ativo";
pub const XP_PER_LEVEL: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub psychologist_id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub responsible_name: Option<String>,
    #[serde(default)]
    pub responsible_phone: Option<String>,
    #[serde(default)]
    pub responsible_email: Option<String>,
    #[serde(default)]
    pub responsible_relationship: Option<String>,
    #[serde(default)]
    pub school_name: Option<String>,
    #[serde(default)]
    pub school_grade: Option<String>,
    #[serde(default)]
    pub referral_source: Option<String>,
    #[serde(default)]
    pub main_complaint: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub session_frequency: Option<String>,
    #[serde(default)]
    pub session_day: Option<String>,
    #[serde(default)]
    pub session_time: Option<String>,
    #[serde(default)]
    pub health_insurance: Option<String>,
    #[serde(default)]
    pub session_value: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub coins: Option<i64>,
    #[serde(default)]
    pub xp: Option<i64>,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn age(&self) -> Option<u32> {
        let birth_date = self.birth_date?;
        Utc::now().date_naive().years_since(birth_date)
    }

    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some(ACTIVE_STATUS)
    }
}

/// Gamification counters after a reward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Progress {
    pub coins: i64,
    pub xp: i64,
    pub level: i64,
}

impl Progress {
    pub fn of(patient: &Patient) -> Self {
        let xp = patient.xp.unwrap_or(0);
        Self {
            coins: patient.coins.unwrap_or(0),
            xp,
            level: patient.level.unwrap_or_else(|| level_for_xp(xp)),
        }
    }

    pub fn rewarded(self, coins: i64, xp: i64) -> Self {
        let xp = self.xp + xp;
        Self {
            coins: self.coins + coins,
            xp,
            level: level_for_xp(xp),
        }
    }
}

pub fn level_for_xp(xp: i64) -> i64 {
    xp.max(0) / XP_PER_LEVEL + 1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub name: String,
    #[serde(default)]
    pub psychologist_id: Option<Uuid>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub responsible_name: Option<String>,
    #[serde(default)]
    pub responsible_phone: Option<String>,
    #[serde(default)]
    pub responsible_email: Option<String>,
    #[serde(default)]
    pub responsible_relationship: Option<String>,
    #[serde(default)]
    pub school_name: Option<String>,
    #[serde(default)]
    pub school_grade: Option<String>,
    #[serde(default)]
    pub referral_source: Option<String>,
    #[serde(default)]
    pub main_complaint: Option<String>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub medications: Option<String>,
    #[serde(default)]
    pub session_frequency: Option<String>,
    #[serde(default)]
    pub session_day: Option<String>,
    #[serde(default)]
    pub session_time: Option<String>,
    #[serde(default)]
    pub health_insurance: Option<String>,
    #[serde(default)]
    pub session_value: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_complaint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_insurance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientQuery {
    pub psychologist_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardRequest {
    pub coins: i64,
    pub xp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound | PatientError::Backend(BackendError::NoRows) => {
                AppError::NotFound("Patient not found".to_string())
            }
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::Backend(backend) => backend.into(),
        }
    }
}
