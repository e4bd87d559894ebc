use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{RetryPolicy, SupabaseClient};
use shared_models::auth::User;

use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    /// Points the config at a mock backend (usually `MockServer::uri()`).
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }

    /// State whose backend client retries quickly, so tests never wait on
    /// production backoff delays.
    pub fn to_state(&self) -> AppState {
        let config = self.to_app_config();
        let client = SupabaseClient::with_retry_policy(&config, Self::fast_retry_policy());
        AppState::with_client(config, client)
    }

    pub fn fast_retry_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            initial_delay: Duration::from_millis(5),
            backoff_multiplier: 1.5,
            first_attempt_timeout: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "psychologist".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn psychologist(email: &str) -> Self {
        Self::new(email, "psychologist")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + chrono::Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// PostgREST-shaped rows for the clinic tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn profile_response(user_id: &str) -> serde_json::Value {
        json!({
            "id": user_id,
            "full_name": "Dra. Teste",
            "crp": "07/12345",
            "phone": null,
            "avatar_url": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn patient_response(patient_id: &str, psychologist_id: &str, name: &str) -> serde_json::Value {
        json!({
            "id": patient_id,
            "psychologist_id": psychologist_id,
            "name": name,
            "birth_date": "2016-05-10",
            "responsible_name": "Maria",
            "responsible_phone": "54999990000",
            "session_frequency": "semanal",
            "status": "ativo",
            "coins": 40,
            "xp": 250,
            "level": 3,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: &str,
        psychologist_id: &str,
        date: &str,
        start_time: &str,
        end_time: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "psychologist_id": psychologist_id,
            "patient_id": null,
            "patient_name_manual": "Walk-in",
            "phone_manual": "54999990000",
            "date": date,
            "start_time": start_time,
            "end_time": end_time,
            "status": "agendado",
            "session_type": "individual",
            "notes": null,
            "location": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn transaction_response(tx_id: &str, psychologist_id: &str, kind: &str, amount: f64) -> serde_json::Value {
        json!({
            "id": tx_id,
            "psychologist_id": psychologist_id,
            "type": kind,
            "category": "Sessão",
            "amount": amount,
            "date": "2024-03-01",
            "description": null,
            "status": "pago",
            "payment_method": "Pix",
            "created_at": "2024-03-01T00:00:00Z"
        })
    }

    pub fn no_rows_response() -> serde_json::Value {
        json!({
            "code": "PGRST116",
            "details": "The result contains 0 rows",
            "hint": null,
            "message": "JSON object requested, multiple (or no) rows returned"
        })
    }

    pub fn unique_violation_response() -> serde_json::Value {
        json!({
            "code": "23505",
            "details": null,
            "hint": null,
            "message": "duplicate key value violates unique constraint"
        })
    }
}
