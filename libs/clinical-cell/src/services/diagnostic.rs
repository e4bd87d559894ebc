use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use shared_database::{tables, SupabaseClient};

use crate::models::{ClinicalError, CreateDiagnosticRequest, Diagnostic};

pub fn diagnostics_filter(patient_id: Uuid, parents_only: bool) -> String {
    let mut filter = format!("patient_id=eq.{}&order=created_at.desc", patient_id);
    if parents_only {
        filter.push_str("&share_with_parents=eq.true");
    }
    filter
}

pub struct DiagnosticService {
    supabase: Arc<SupabaseClient>,
}

impl DiagnosticService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Newest first. `parents_only` keeps the reports shared with the family.
    pub async fn list_diagnostics(
        &self,
        patient_id: Uuid,
        parents_only: bool,
        auth_token: Option<&str>,
    ) -> Result<Vec<Diagnostic>, ClinicalError> {
        let filter = diagnostics_filter(patient_id, parents_only);

        let diagnostics = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<Diagnostic>(tables::DIAGNOSTICS, &filter, auth_token))
            .await?;
        Ok(diagnostics)
    }

    pub async fn create_diagnostic(&self, request: CreateDiagnosticRequest, auth_token: &str) -> Result<Diagnostic, ClinicalError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ClinicalError::ValidationError("Title is required".to_string()));
        }

        let row = json!({
            "patient_id": request.patient_id,
            "title": title,
            "content": request.content,
            "diagnostic_type": request.diagnostic_type,
            "share_with_parents": request.share_with_parents,
        });

        let diagnostic: Diagnostic = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.insert(tables::DIAGNOSTICS, row.clone(), Some(auth_token)))
            .await?;

        info!(
            "Diagnostic {} added for patient {} (shared: {})",
            diagnostic.id, diagnostic.patient_id, diagnostic.share_with_parents
        );
        Ok(diagnostic)
    }
}
