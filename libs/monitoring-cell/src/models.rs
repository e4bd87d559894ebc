use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shown to staff while the backend probe is failing.
pub const OFFLINE_BANNER: &str = "CONEXÃO INSTÁVEL: O sistema pode demorar para responder.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectivityStatus {
    pub online: bool,
    pub banner: Option<String>,
    /// `None` until the first probe finishes.
    pub last_checked: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl Default for ConnectivityStatus {
    fn default() -> Self {
        Self {
            online: true,
            banner: None,
            last_checked: None,
            last_error: None,
            consecutive_failures: 0,
        }
    }
}

impl ConnectivityStatus {
    pub fn succeeded(at: DateTime<Utc>) -> Self {
        Self {
            last_checked: Some(at),
            ..Self::default()
        }
    }

    pub fn failed(&self, at: DateTime<Utc>, error: String) -> Self {
        Self {
            online: false,
            banner: Some(OFFLINE_BANNER.to_string()),
            last_checked: Some(at),
            last_error: Some(error),
            consecutive_failures: self.consecutive_failures.saturating_add(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}
