use std::sync::Arc;

use rand::Rng;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{tables, BackendError, RetryableError, SupabaseClient};

use crate::models::{PortalAccess, PortalError, PortalType, ACCESS_CODE_LENGTH, MIN_ACCESS_CODE_LENGTH};

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Fresh codes drawn when the generated one collides with an existing grant.
const MAX_CODE_COLLISIONS: usize = 3;

pub fn random_access_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ACCESS_CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// Trims and uppercases what the family typed. Only 4 to 6 characters from
/// `A-Z0-9` get through, so the code is safe to place in a filter.
pub fn normalize_code(code: &str) -> Result<String, PortalError> {
    let clean = code.trim().to_ascii_uppercase();
    let well_formed = (MIN_ACCESS_CODE_LENGTH..=ACCESS_CODE_LENGTH).contains(&clean.len())
        && clean.bytes().all(|b| CODE_CHARSET.contains(&b));
    if !well_formed {
        return Err(PortalError::ValidationError("Enter a valid access code".to_string()));
    }
    Ok(clean)
}

pub struct AccessService {
    supabase: Arc<SupabaseClient>,
}

impl AccessService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn generate_access_code(
        &self,
        patient_id: Uuid,
        portal_type: PortalType,
        auth_token: &str,
    ) -> Result<PortalAccess, PortalError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let row = json!({
                "patient_id": patient_id,
                "portal_type": portal_type,
                "access_code": random_access_code(),
            });

            let result: Result<PortalAccess, BackendError> = self
                .supabase
                .retry_policy()
                .execute(|| self.supabase.insert(tables::PORTAL_ACCESS, row.clone(), Some(auth_token)))
                .await;

            match result {
                Ok(access) => {
                    info!("Generated {} portal code for patient {}", portal_type, patient_id);
                    return Ok(access);
                }
                Err(e) if e.is_conflict() && attempt < MAX_CODE_COLLISIONS => {
                    debug!("Access code collision, drawing another");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Active grants of one patient.
    pub async fn list_access_codes(&self, patient_id: Uuid, auth_token: &str) -> Result<Vec<PortalAccess>, PortalError> {
        let filter = format!("patient_id=eq.{}&is_active=eq.true", patient_id);

        let codes = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<PortalAccess>(tables::PORTAL_ACCESS, &filter, Some(auth_token)))
            .await?;
        Ok(codes)
    }

    /// Looks up an active grant together with the patient and clinician.
    ///
    /// An unknown code and any terminal backend error both read as `None`;
    /// only an exhausted transient failure comes back as an error.
    pub async fn validate_access_code(&self, code: &str) -> Result<Option<PortalAccess>, PortalError> {
        let code = normalize_code(code)?;
        let filter = format!(
            "select=*,{}(*,{}(*))&access_code=eq.{}&is_active=eq.true&limit=1",
            tables::PATIENTS,
            tables::PROFILES,
            code
        );

        let result = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<PortalAccess>(tables::PORTAL_ACCESS, &filter, None))
            .await;

        match result {
            Ok(rows) => Ok(rows.into_iter().next()),
            Err(e) if e.is_transient() => Err(e.into()),
            Err(e) => {
                warn!("Access code validation failed: {}", e);
                Ok(None)
            }
        }
    }

    /// Valid grant of the expected kind, with the patient embedded.
    pub async fn open_portal(&self, code: &str, expected: PortalType) -> Result<PortalAccess, PortalError> {
        let access = self.validate_access_code(code).await?.ok_or(PortalError::NotFound)?;

        if access.portal_type != expected || access.patient.is_none() {
            debug!("Code {} does not open the {} portal", access.access_code, expected);
            return Err(PortalError::NotFound);
        }
        Ok(access)
    }
}
