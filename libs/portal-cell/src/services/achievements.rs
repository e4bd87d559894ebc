use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{tables, SupabaseClient};

use crate::models::{Achievement, PatientAchievement, PortalError};

pub struct AchievementService {
    supabase: Arc<SupabaseClient>,
}

impl AchievementService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Full catalogue, easiest first.
    pub async fn list_achievements(&self, auth_token: Option<&str>) -> Result<Vec<Achievement>, PortalError> {
        let achievements = self
            .supabase
            .retry_policy()
            .execute(|| {
                self.supabase
                    .select::<Achievement>(tables::ACHIEVEMENTS, "order=requirement_value.asc", auth_token)
            })
            .await?;
        Ok(achievements)
    }

    /// Most recent unlock first, each with its catalogue entry.
    pub async fn list_unlocked(
        &self,
        patient_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<PatientAchievement>, PortalError> {
        let filter = format!(
            "select=*,{}(*)&patient_id=eq.{}&order=unlocked_at.desc",
            tables::ACHIEVEMENTS,
            patient_id
        );

        let unlocked = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<PatientAchievement>(tables::PATIENT_ACHIEVEMENTS, &filter, auth_token))
            .await?;

        debug!("Patient {} has {} achievements", patient_id, unlocked.len());
        Ok(unlocked)
    }

    /// `None` when the patient already holds the achievement.
    pub async fn unlock(
        &self,
        patient_id: Uuid,
        achievement_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<PatientAchievement>, PortalError> {
        let row = json!({
            "patient_id": patient_id,
            "achievement_id": achievement_id,
        });

        let result = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.insert::<PatientAchievement>(tables::PATIENT_ACHIEVEMENTS, row.clone(), Some(auth_token)))
            .await;

        match result {
            Ok(unlocked) => {
                info!("Achievement {} unlocked for patient {}", achievement_id, patient_id);
                Ok(Some(unlocked))
            }
            Err(e) if e.is_conflict() => {
                debug!("Achievement {} already unlocked for patient {}", achievement_id, patient_id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
