use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{tables, BackendError, SupabaseClient};

use crate::models::{
    CreatePatientRequest, Patient, PatientError, PatientQuery, Progress, UpdatePatientRequest,
    ACTIVE_STATUS, DEFAULT_SESSION_FREQUENCY,
};

/// Blank form fields are stored as null.
fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Row written on create: optional fields cleaned, status and frequency defaulted.
pub fn new_patient_row(request: CreatePatientRequest) -> Result<Value, PatientError> {
    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(PatientError::ValidationError("Patient name is required".to_string()));
    }

    Ok(json!({
        "name": name,
        "psychologist_id": request.psychologist_id,
        "birth_date": request.birth_date,
        "gender": clean(request.gender),
        "cpf": clean(request.cpf),
        "responsible_name": clean(request.responsible_name),
        "responsible_phone": clean(request.responsible_phone),
        "responsible_email": clean(request.responsible_email),
        "responsible_relationship": clean(request.responsible_relationship),
        "school_name": clean(request.school_name),
        "school_grade": clean(request.school_grade),
        "referral_source": clean(request.referral_source),
        "main_complaint": clean(request.main_complaint),
        "diagnosis": clean(request.diagnosis),
        "medications": clean(request.medications),
        "session_frequency": clean(request.session_frequency)
            .unwrap_or_else(|| DEFAULT_SESSION_FREQUENCY.to_string()),
        "session_day": clean(request.session_day),
        "session_time": clean(request.session_time),
        "health_insurance": clean(request.health_insurance),
        "session_value": request.session_value.filter(|v| *v > 0.0),
        "notes": clean(request.notes),
        "status": ACTIVE_STATUS,
    }))
}

pub struct PatientService {
    supabase: Arc<SupabaseClient>,
}

impl PatientService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Newest first.
    pub async fn list_patients(&self, query: &PatientQuery, auth_token: &str) -> Result<Vec<Patient>, PatientError> {
        let mut filter = String::from("order=created_at.desc");
        if let Some(psychologist_id) = query.psychologist_id {
            filter.push_str(&format!("&psychologist_id=eq.{}", psychologist_id));
        }

        let patients = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<Patient>(tables::PATIENTS, &filter, Some(auth_token)))
            .await?;

        debug!("Fetched {} patients", patients.len());
        Ok(patients)
    }

    pub async fn get_patient(&self, patient_id: Uuid, auth_token: Option<&str>) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        let filter = format!("id=eq.{}", patient_id);
        let mut rows = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<Patient>(tables::PATIENTS, &filter, auth_token))
            .await?;

        if rows.is_empty() {
            return Err(PatientError::NotFound);
        }
        Ok(rows.swap_remove(0))
    }

    pub async fn create_patient(&self, request: CreatePatientRequest, auth_token: &str) -> Result<Patient, PatientError> {
        let row = new_patient_row(request)?;

        let patient: Patient = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.insert(tables::PATIENTS, row.clone(), Some(auth_token)))
            .await?;

        info!("Patient {} created", patient.id);
        Ok(patient)
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        if request.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(PatientError::ValidationError("Patient name cannot be blank".to_string()));
        }

        self.patch(patient_id, json!(request), Some(auth_token)).await
    }

    /// Adds coins and XP, then recomputes the level from the new XP total.
    pub async fn add_rewards(
        &self,
        patient_id: Uuid,
        coins: i64,
        xp: i64,
        auth_token: Option<&str>,
    ) -> Result<Patient, PatientError> {
        if coins < 0 || xp < 0 {
            return Err(PatientError::ValidationError("Rewards cannot be negative".to_string()));
        }

        let current = self.get_patient(patient_id, auth_token).await?;
        let progress = Progress::of(&current).rewarded(coins, xp);

        let updated = self.patch(patient_id, json!(progress), auth_token).await?;
        info!(
            "Patient {} rewarded: +{} coins, +{} xp (level {})",
            patient_id, coins, xp, progress.level
        );
        Ok(updated)
    }

    async fn patch(&self, patient_id: Uuid, patch: Value, auth_token: Option<&str>) -> Result<Patient, PatientError> {
        let filter = format!("id=eq.{}", patient_id);
        self.supabase
            .retry_policy()
            .execute(|| self.supabase.update::<Patient>(tables::PATIENTS, &filter, patch.clone(), auth_token))
            .await
            .map_err(|e| match e {
                BackendError::NoRows => PatientError::NotFound,
                other => other.into(),
            })
    }
}
