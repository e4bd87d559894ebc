use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use patient_cell::models::Patient;
use patient_cell::services::PatientService;
use shared_database::{tables, BackendError, SupabaseClient};

use crate::models::{CreateTaskRequest, PortalError, Task, TaskStatus, DEFAULT_TASK_COINS, DEFAULT_TASK_XP};

const DEFAULT_DIFFICULTY: &str = "normal";
const DEFAULT_EMOJI: &str = "⭐";
const DEFAULT_CATEGORY: &str = "diaria";

pub fn new_task_row(request: CreateTaskRequest) -> Result<Value, PortalError> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(PortalError::ValidationError("Task title is required".to_string()));
    }
    if request.coins_reward.is_some_and(|c| c < 0) || request.xp_reward.is_some_and(|x| x < 0) {
        return Err(PortalError::ValidationError("Rewards cannot be negative".to_string()));
    }

    Ok(json!({
        "patient_id": request.patient_id,
        "title": title,
        "description": request.description.filter(|d| !d.trim().is_empty()),
        "difficulty": request.difficulty.unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
        "coins_reward": request.coins_reward.unwrap_or(DEFAULT_TASK_COINS),
        "xp_reward": request.xp_reward.unwrap_or(DEFAULT_TASK_XP),
        "emoji": request.emoji.unwrap_or_else(|| DEFAULT_EMOJI.to_string()),
        "category": request.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        "status": TaskStatus::Pending,
    }))
}

pub struct TaskService {
    supabase: Arc<SupabaseClient>,
}

impl TaskService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Newest first.
    pub async fn list_tasks(&self, patient_id: Uuid, auth_token: Option<&str>) -> Result<Vec<Task>, PortalError> {
        let filter = format!("patient_id=eq.{}&order=created_at.desc", patient_id);

        let tasks = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<Task>(tables::TASKS, &filter, auth_token))
            .await?;

        debug!("Fetched {} tasks for patient {}", tasks.len(), patient_id);
        Ok(tasks)
    }

    pub async fn get_task(&self, task_id: Uuid, auth_token: Option<&str>) -> Result<Task, PortalError> {
        let filter = format!("id=eq.{}", task_id);
        let mut rows = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<Task>(tables::TASKS, &filter, auth_token))
            .await?;

        if rows.is_empty() {
            return Err(PortalError::TaskNotFound);
        }
        Ok(rows.swap_remove(0))
    }

    pub async fn create_task(&self, request: CreateTaskRequest, auth_token: &str) -> Result<Task, PortalError> {
        let row = new_task_row(request)?;

        let task: Task = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.insert(tables::TASKS, row.clone(), Some(auth_token)))
            .await?;

        info!("Task {} assigned to patient {}", task.id, task.patient_id);
        Ok(task)
    }

    /// Marks the task done, then credits its rewards to the patient.
    pub async fn complete_task(&self, task: Task, auth_token: Option<&str>) -> Result<(Task, Patient), PortalError> {
        if task.is_completed() {
            return Err(PortalError::TaskAlreadyCompleted);
        }

        let filter = format!("id=eq.{}", task.id);
        let patch = json!({
            "status": TaskStatus::Completed,
            "completed_at": Utc::now(),
        });

        let completed: Task = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.update::<Task>(tables::TASKS, &filter, patch.clone(), auth_token))
            .await
            .map_err(|e| match e {
                BackendError::NoRows => PortalError::TaskNotFound,
                other => other.into(),
            })?;

        let (coins, xp) = task.rewards();
        let patient = PatientService::new(self.supabase.clone())
            .add_rewards(task.patient_id, coins, xp, auth_token)
            .await?;

        info!("Task {} completed by patient {}", completed.id, completed.patient_id);
        Ok((completed, patient))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_task_row_defaults() {
        let row = new_task_row(CreateTaskRequest {
            patient_id: Uuid::nil(),
            title: " Arrumar a mochila ".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(row["title"], "Arrumar a mochila");
        assert_eq!(row["coins_reward"], 10);
        assert_eq!(row["xp_reward"], 25);
        assert_eq!(row["status"], "pendente");
        assert_eq!(row["difficulty"], "normal");
        assert_eq!(row["category"], "diaria");
    }

    #[test]
    fn test_task_row_validation() {
        assert_matches!(new_task_row(CreateTaskRequest::default()), Err(PortalError::ValidationError(_)));

        let negative = CreateTaskRequest {
            title: "Desenhar".to_string(),
            coins_reward: Some(-5),
            ..Default::default()
        };
        assert_matches!(new_task_row(negative), Err(PortalError::ValidationError(_)));
    }
}
