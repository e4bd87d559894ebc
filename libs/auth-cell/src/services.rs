use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_database::{tables, BackendError, SupabaseClient};
use shared_models::auth::{AuthSession, AuthUser, Profile};
use shared_models::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Auth(err.to_string()),
            AuthError::ValidationError(msg) => AppError::ValidationError(msg),
            AuthError::Backend(backend) => backend.into(),
        }
    }
}

pub struct AuthService {
    supabase: Arc<SupabaseClient>,
}

impl AuthService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::ValidationError("Email and password are required".to_string()));
        }

        let session = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.sign_in_with_password(email.trim(), password))
            .await
            .map_err(|e| match e {
                // Wrong credentials are final; everything else keeps its kind
                BackendError::Auth(_) => AuthError::InvalidCredentials,
                other => AuthError::Backend(other),
            })?;

        info!("User {} signed in", session.user.id);
        Ok(session)
    }

    /// Creates the account, then its profile row. A failed profile insert is
    /// logged and left for a later sign-in to repair.
    pub async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<AuthUser, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::ValidationError("Email and password are required".to_string()));
        }
        if full_name.trim().is_empty() {
            return Err(AuthError::ValidationError("Full name is required".to_string()));
        }

        let user = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.sign_up(email.trim(), password, full_name))
            .await?;

        let row = json!({ "id": user.id, "full_name": full_name });
        let profile = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.insert::<Value>(tables::PROFILES, row.clone(), None))
            .await;

        match profile {
            Ok(_) => info!("Profile created for {}", user.id),
            Err(e) => warn!("Could not create profile for {}: {}", user.id, e),
        }

        Ok(user)
    }

    pub async fn sign_out(&self, auth_token: &str) -> Result<(), AuthError> {
        self.supabase.sign_out(auth_token).await?;
        debug!("Session revoked");
        Ok(())
    }

    /// `None` when the profile row has not been provisioned yet.
    pub async fn fetch_profile(&self, user_id: &str, auth_token: &str) -> Result<Option<Profile>, AuthError> {
        let result = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.get_profile(user_id, Some(auth_token)))
            .await;

        match result {
            Ok(profile) => Ok(Some(profile)),
            Err(BackendError::NoRows) => {
                warn!("Profile not created yet for user {}", user_id);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
