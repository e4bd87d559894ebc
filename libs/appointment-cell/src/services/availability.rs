// libs/appointment-cell/src/services/availability.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{tables, BackendError, SupabaseClient};

use crate::models::{Appointment, AppointmentError};

/// Opening window for one weekday. Slots start on every whole hour in `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHours {
    pub start: u32,
    pub end: u32,
}

/// Weekday (0 = Sunday .. 6 = Saturday) to opening window. Absent days are closed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceHoursPolicy {
    days: BTreeMap<u8, ServiceHours>,
}

impl ServiceHoursPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an opening window. Out-of-range weekdays and empty or inverted
    /// windows are ignored.
    pub fn with_day(mut self, weekday: u8, start: u32, end: u32) -> Self {
        if weekday <= 6 && start < end && end <= 24 {
            self.days.insert(weekday, ServiceHours { start, end });
        }
        self
    }

    /// Mon 13-17, Wed 13-22, Thu 13-17, Fri 13-17, Sat 8-12.
    pub fn clinic_default() -> Self {
        Self::new()
            .with_day(1, 13, 17)
            .with_day(3, 13, 22)
            .with_day(4, 13, 17)
            .with_day(5, 13, 17)
            .with_day(6, 8, 12)
    }

    pub fn hours_for(&self, weekday: u8) -> Option<ServiceHours> {
        self.days.get(&weekday).copied()
    }

    pub fn is_open(&self, date: NaiveDate) -> bool {
        self.hours_for(weekday_index(date)).is_some()
    }
}

pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn slot_label(hour: u32) -> String {
    format!("{:02}:00", hour)
}

/// Free hourly slots for `date`, ascending. A slot is taken when any existing
/// appointment's start time begins with its label, whatever that appointment's
/// status.
pub fn resolve_available_slots(
    date: NaiveDate,
    existing: &[Appointment],
    policy: &ServiceHoursPolicy,
) -> Vec<String> {
    let Some(hours) = policy.hours_for(weekday_index(date)) else {
        return Vec::new();
    };

    (hours.start..hours.end)
        .map(slot_label)
        .filter(|label| !existing.iter().any(|app| app.occupies_slot(label)))
        .collect()
}

pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    policy: ServiceHoursPolicy,
}

impl AvailabilityService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self::with_policy(supabase, ServiceHoursPolicy::clinic_default())
    }

    pub fn with_policy(supabase: Arc<SupabaseClient>, policy: ServiceHoursPolicy) -> Self {
        Self { supabase, policy }
    }

    pub fn policy(&self) -> &ServiceHoursPolicy {
        &self.policy
    }

    /// Appointments booked on `date`, optionally for one psychologist.
    pub async fn appointments_on(
        &self,
        date: NaiveDate,
        psychologist_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>, BackendError> {
        let mut query = format!("date=eq.{}", date);
        if let Some(psychologist_id) = psychologist_id {
            query.push_str(&format!("&psychologist_id=eq.{}", psychologist_id));
        }
        query.push_str("&order=start_time.asc");

        self.supabase
            .retry_policy()
            .execute(|| self.supabase.select::<Appointment>(tables::APPOINTMENTS, &query, auth_token))
            .await
    }

    /// Closed days never reach the backend. A failed fetch is an error, not an
    /// empty day.
    pub async fn get_available_slots(
        &self,
        date: NaiveDate,
        psychologist_id: Option<Uuid>,
        auth_token: Option<&str>,
    ) -> Result<Vec<String>, AppointmentError> {
        if !self.policy.is_open(date) {
            debug!("Clinic closed on {} (weekday {})", date, weekday_index(date));
            return Ok(Vec::new());
        }

        let existing = self.appointments_on(date, psychologist_id, auth_token).await?;
        let slots = resolve_available_slots(date, &existing, &self.policy);

        info!("{} free slots on {} ({} booked)", slots.len(), date, existing.len());
        Ok(slots)
    }
}
