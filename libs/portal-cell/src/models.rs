use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use clinical_cell::models::{ClinicalError, Diagnostic, Evolution};
use patient_cell::models::{level_for_xp, Patient, PatientError, XP_PER_LEVEL};
use shared_database::BackendError;
use shared_models::auth::Profile;
use shared_models::error::AppError;

pub const ACCESS_CODE_LENGTH: usize = 6;
pub const MIN_ACCESS_CODE_LENGTH: usize = 4;
pub const DEFAULT_TASK_COINS: i64 = 10;
pub const DEFAULT_TASK_XP: i64 = 25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PortalType {
    #[serde(rename = "pais")]
    Parents,
    #[serde(rename = "aluno")]
    Student,
}

impl PortalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PortalType::Parents => "pais",
            PortalType::Student => "aluno",
        }
    }
}

impl fmt::Display for PortalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Patient row as embedded in an access grant, with the clinician's profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortalPatient {
    #[serde(flatten)]
    pub patient: Patient,
    #[serde(rename = "profiles_psico", default)]
    pub psychologist: Option<Profile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortalAccess {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub portal_type: PortalType,
    pub access_code: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "patients_psico", default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<PortalPatient>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateAccessCodeRequest {
    pub portal_type: PortalType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalLoginRequest {
    pub code: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "concluida")]
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub coins_reward: Option<i64>,
    #[serde(default)]
    pub xp_reward: Option<i64>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// (coins, xp) granted on completion. Zero or missing rewards fall back to the defaults.
    pub fn rewards(&self) -> (i64, i64) {
        let coins = self.coins_reward.filter(|c| *c > 0).unwrap_or(DEFAULT_TASK_COINS);
        let xp = self.xp_reward.filter(|x| *x > 0).unwrap_or(DEFAULT_TASK_XP);
        (coins, xp)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub patient_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub coins_reward: Option<i64>,
    #[serde(default)]
    pub xp_reward: Option<i64>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Achievement {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub coins_bonus: Option<i64>,
    #[serde(default)]
    pub requirement_type: Option<String>,
    #[serde(default)]
    pub requirement_value: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientAchievement {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub achievement_id: Uuid,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
    #[serde(rename = "achievements_psico", default, skip_serializing_if = "Option::is_none")]
    pub achievement: Option<Achievement>,
}

/// Gamification summary shown on the student portal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudentProgress {
    pub coins: i64,
    pub xp: i64,
    pub level: i64,
    pub xp_into_level: i64,
    pub xp_for_next_level: i64,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
}

impl StudentProgress {
    pub fn compute(patient: &Patient, tasks: &[Task]) -> Self {
        let xp = patient.xp.unwrap_or(0).max(0);
        let level = patient.level.filter(|l| *l > 0).unwrap_or_else(|| level_for_xp(xp));
        let completed_tasks = tasks.iter().filter(|t| t.is_completed()).count();

        Self {
            coins: patient.coins.unwrap_or(0),
            xp,
            level,
            xp_into_level: xp % XP_PER_LEVEL,
            xp_for_next_level: level * XP_PER_LEVEL,
            completed_tasks,
            pending_tasks: tasks.len() - completed_tasks,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParentView {
    pub access_code: String,
    pub patient: Patient,
    pub psychologist: Option<Profile>,
    pub evolutions: Vec<Evolution>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentView {
    pub access_code: String,
    pub patient: Patient,
    pub psychologist: Option<Profile>,
    pub tasks: Vec<Task>,
    pub achievements: Vec<Achievement>,
    pub unlocked: Vec<PatientAchievement>,
    pub progress: StudentProgress,
}

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("Portal not found")]
    NotFound,

    #[error("Task not found")]
    TaskNotFound,

    #[error("Task already completed")]
    TaskAlreadyCompleted,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<PatientError> for PortalError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => PortalError::NotFound,
            PatientError::ValidationError(msg) => PortalError::ValidationError(msg),
            PatientError::Backend(backend) => PortalError::Backend(backend),
        }
    }
}

impl From<ClinicalError> for PortalError {
    fn from(err: ClinicalError) -> Self {
        match err {
            ClinicalError::ValidationError(msg) => PortalError::ValidationError(msg),
            ClinicalError::Backend(backend) => PortalError::Backend(backend),
        }
    }
}

impl From<PortalError> for AppError {
    fn from(err: PortalError) -> Self {
        match err {
            PortalError::NotFound => {
                AppError::NotFound("Invalid or expired access code".to_string())
            }
            PortalError::TaskNotFound => AppError::NotFound(err.to_string()),
            PortalError::TaskAlreadyCompleted => AppError::Conflict(err.to_string()),
            PortalError::ValidationError(msg) => AppError::ValidationError(msg),
            PortalError::Backend(backend) => backend.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient(xp: i64, level: Option<i64>) -> Patient {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "psychologist_id": null,
            "name": "Lucas",
            "coins": 40,
            "xp": xp,
            "level": level
        }))
        .unwrap()
    }

    fn task(status: &str) -> Task {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "title": "Ler 10 minutos",
            "status": status
        }))
        .unwrap()
    }

    #[test]
    fn test_progress_counters() {
        let tasks = vec![task("concluida"), task("pendente"), task("pendente")];
        let progress = StudentProgress::compute(&patient(250, Some(3)), &tasks);

        assert_eq!(progress.level, 3);
        assert_eq!(progress.xp_into_level, 50);
        assert_eq!(progress.xp_for_next_level, 300);
        assert_eq!(progress.completed_tasks, 1);
        assert_eq!(progress.pending_tasks, 2);
    }

    #[test]
    fn test_progress_derives_missing_level() {
        let progress = StudentProgress::compute(&patient(120, None), &[]);
        assert_eq!(progress.level, 2);
        assert_eq!(progress.xp_for_next_level, 200);
    }

    #[test]
    fn test_task_reward_defaults() {
        let mut t = task("pendente");
        assert_eq!(t.rewards(), (10, 25));

        t.coins_reward = Some(30);
        t.xp_reward = Some(0);
        assert_eq!(t.rewards(), (30, 25));
    }

    #[test]
    fn test_grant_with_embedded_patient() {
        let access: PortalAccess = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "patient_id": Uuid::new_v4(),
            "portal_type": "aluno",
            "access_code": "K7Q2ZD",
            "patients_psico": {
                "id": Uuid::new_v4(),
                "psychologist_id": null,
                "name": "Lucas",
                "profiles_psico": { "id": "p1", "full_name": "Dra. Mayne" }
            }
        }))
        .unwrap();

        assert_eq!(access.portal_type, PortalType::Student);
        assert!(access.is_active);
        let embedded = access.patient.unwrap();
        assert_eq!(embedded.patient.name, "Lucas");
        assert_eq!(embedded.psychologist.unwrap().full_name.as_deref(), Some("Dra. Mayne"));
    }
}
