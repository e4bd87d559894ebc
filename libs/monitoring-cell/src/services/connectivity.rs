use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{info, warn};

use shared_database::SupabaseClient;

use crate::models::ConnectivityStatus;

/// Tracks whether the hosted backend answered the last probe.
pub struct ConnectivityMonitor {
    supabase: Arc<SupabaseClient>,
    status: RwLock<ConnectivityStatus>,
    started: Instant,
}

impl ConnectivityMonitor {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            supabase,
            status: RwLock::new(ConnectivityStatus::default()),
            started: Instant::now(),
        }
    }

    pub async fn status(&self) -> ConnectivityStatus {
        self.status.read().await.clone()
    }

    pub async fn is_offline(&self) -> bool {
        !self.status.read().await.online
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Runs the connection check (with its retries) and records the outcome.
    pub async fn probe(&self) -> ConnectivityStatus {
        let result = self.supabase.check_connection().await;
        let now = Utc::now();

        let mut status = self.status.write().await;
        let next = match result {
            Ok(()) => {
                if !status.online {
                    info!("Backend reachable again after {} failed probes", status.consecutive_failures);
                }
                ConnectivityStatus::succeeded(now)
            }
            Err(e) => {
                warn!("Backend probe failed: {}", e);
                status.failed(now, e.to_string())
            }
        };

        *status = next.clone();
        next
    }

    /// Probes forever on a fixed interval. Meant to be spawned at startup.
    pub async fn run(self: Arc<Self>, every: Duration) {
        let mut ticker = probe_ticker(every);
        loop {
            ticker.tick().await;
            self.probe().await;
        }
    }
}

/// A probe that outlasts the interval (retries included) pushes the next
/// tick back instead of firing the missed ones back to back.
fn probe_ticker(every: Duration) -> Interval {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_delays_next_tick() {
        let mut ticker = probe_ticker(Duration::from_secs(30));
        assert_eq!(ticker.missed_tick_behavior(), MissedTickBehavior::Delay);

        ticker.tick().await;
        // One failing probe with full retries takes far longer than the interval.
        tokio::time::advance(Duration::from_secs(145)).await;

        ticker.tick().await;
        let after_late_tick = tokio::time::Instant::now();
        ticker.tick().await;
        assert!(tokio::time::Instant::now() - after_late_tick >= Duration::from_secs(30));
    }
}
