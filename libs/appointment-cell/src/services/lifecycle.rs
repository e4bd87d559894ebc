// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status.
    /// Moving back to `Scheduled` only happens through a reschedule.
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Canceled,
                AppointmentStatus::Completed,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Scheduled,
                AppointmentStatus::Canceled,
                AppointmentStatus::Completed,
            ],
            AppointmentStatus::Canceled => vec![AppointmentStatus::Scheduled],
            AppointmentStatus::Completed => vec![],
        }
    }

    /// Rescheduling an appointment puts it back into `Scheduled`, so it is
    /// allowed from every state that can reach it, plus `Scheduled` itself.
    pub fn can_reschedule(&self, current_status: AppointmentStatus) -> bool {
        current_status == AppointmentStatus::Scheduled
            || self
                .get_valid_transitions(current_status)
                .contains(&AppointmentStatus::Scheduled)
    }

    pub fn is_terminal(&self, status: AppointmentStatus) -> bool {
        self.get_valid_transitions(status).is_empty()
    }
}
