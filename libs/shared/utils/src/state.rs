use std::sync::Arc;

use axum::extract::FromRef;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

/// Shared handler state: configuration plus the single backend client
/// constructed at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub supabase: Arc<SupabaseClient>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&config));
        Self {
            config: Arc::new(config),
            supabase,
        }
    }

    pub fn with_client(config: AppConfig, supabase: SupabaseClient) -> Self {
        Self {
            config: Arc::new(config),
            supabase: Arc::new(supabase),
        }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<SupabaseClient> {
    fn from_ref(state: &AppState) -> Self {
        state.supabase.clone()
    }
}
