use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{tables, SupabaseClient};

use crate::models::{ClinicalError, CreateEvolutionRequest, Evolution};

pub struct EvolutionService {
    supabase: Arc<SupabaseClient>,
}

impl EvolutionService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Most recent session first.
    pub async fn list_evolutions(&self, patient_id: Uuid, auth_token: Option<&str>) -> Result<Vec<Evolution>, ClinicalError> {
        let filter = format!("patient_id=eq.{}&order=session_date.desc", patient_id);

        let evolutions = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<Evolution>(tables::EVOLUTIONS, &filter, auth_token))
            .await?;

        debug!("Fetched {} evolutions for patient {}", evolutions.len(), patient_id);
        Ok(evolutions)
    }

    /// Objective of the latest session, used to prefill the next note.
    pub async fn latest_objective(&self, patient_id: Uuid, auth_token: &str) -> Result<Option<String>, ClinicalError> {
        let evolutions = self.list_evolutions(patient_id, Some(auth_token)).await?;
        Ok(evolutions
            .into_iter()
            .next()
            .and_then(|e| e.metrics)
            .and_then(|m| m.objective))
    }

    pub async fn create_evolution(&self, request: CreateEvolutionRequest, auth_token: &str) -> Result<Evolution, ClinicalError> {
        request.validate()?;

        let row = json!({
            "patient_id": request.patient_id,
            "psychologist_id": request.psychologist_id,
            "content": request.content,
            "tags": request.tags,
            "session_date": request.session_date.unwrap_or_else(Utc::now),
            "metrics": request.metrics,
        });

        let evolution: Evolution = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.insert(tables::EVOLUTIONS, row.clone(), Some(auth_token)))
            .await?;

        info!("Evolution {} recorded for patient {}", evolution.id, evolution.patient_id);
        Ok(evolution)
    }
}
