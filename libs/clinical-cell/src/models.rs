use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_database::BackendError;
use shared_models::error::AppError;

/// Structured part of a session note.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionMetrics {
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub homework: Option<String>,
    #[serde(default, rename = "parentsFeedback")]
    pub parents_feedback: Option<String>,
    /// 1 (bad) to 5 (great)
    #[serde(default)]
    pub mood_pre: Option<u8>,
    #[serde(default)]
    pub mood_post: Option<u8>,
    #[serde(default)]
    pub techniques: Vec<String>,
}

impl SessionMetrics {
    pub fn has_objective(&self) -> bool {
        self.objective.as_deref().is_some_and(|o| !o.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evolution {
    pub id: Uuid,
    pub patient_id: Uuid,
    #[serde(default)]
    pub psychologist_id: Option<Uuid>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub session_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: Option<SessionMetrics>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateEvolutionRequest {
    /// Taken from the route when absent from the body.
    #[serde(default)]
    pub patient_id: Uuid,
    #[serde(default)]
    pub psychologist_id: Option<Uuid>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub session_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: SessionMetrics,
}

impl CreateEvolutionRequest {
    pub fn validate(&self) -> Result<(), ClinicalError> {
        let has_content = self.content.as_deref().is_some_and(|c| !c.trim().is_empty());
        if !has_content && !self.metrics.has_objective() {
            return Err(ClinicalError::ValidationError(
                "Fill in at least the content or the objective".to_string(),
            ));
        }

        for mood in [self.metrics.mood_pre, self.metrics.mood_post].into_iter().flatten() {
            if !(1..=5).contains(&mood) {
                return Err(ClinicalError::ValidationError(format!(
                    "Mood must be between 1 and 5, got {}",
                    mood
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub diagnostic_type: Option<String>,
    #[serde(default)]
    pub share_with_parents: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDiagnosticRequest {
    #[serde(default)]
    pub patient_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default = "default_diagnostic_type")]
    pub diagnostic_type: String,
    #[serde(default = "default_share")]
    pub share_with_parents: bool,
}

fn default_diagnostic_type() -> String {
    "observacao".to_string()
}

fn default_share() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosticQuery {
    #[serde(default)]
    pub parents_only: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ClinicalError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<ClinicalError> for AppError {
    fn from(err: ClinicalError) -> Self {
        match err {
            ClinicalError::ValidationError(msg) => AppError::ValidationError(msg),
            ClinicalError::Backend(backend) => backend.into(),
        }
    }
}
