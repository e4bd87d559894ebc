use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_CLINIC_WHATSAPP_NUMBER: &str = "5554999999999";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub clinic_whatsapp_number: String,
    pub retry_max_retries: u32,
    pub retry_initial_delay_ms: u64,
    pub connectivity_probe_interval_secs: u64,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            clinic_whatsapp_number: DEFAULT_CLINIC_WHATSAPP_NUMBER.to_string(),
            retry_max_retries: 3,
            retry_initial_delay_ms: 2000,
            connectivity_probe_interval_secs: 30,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            clinic_whatsapp_number: env::var("CLINIC_WHATSAPP_NUMBER")
                .unwrap_or(defaults.clinic_whatsapp_number),
            retry_max_retries: parse_or("RETRY_MAX_RETRIES", defaults.retry_max_retries),
            retry_initial_delay_ms: parse_or("RETRY_INITIAL_DELAY_MS", defaults.retry_initial_delay_ms),
            connectivity_probe_interval_secs: parse_or(
                "CONNECTIVITY_PROBE_INTERVAL_SECS",
                defaults.connectivity_probe_interval_secs,
            ),
            port: parse_or("PORT", defaults.port),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
