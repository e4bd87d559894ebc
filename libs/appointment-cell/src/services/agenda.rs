// libs/appointment-cell/src/services/agenda.rs
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{tables, BackendError, SupabaseClient};

use crate::models::{
    validate_time_range, Appointment, AppointmentError, AppointmentQuery, AppointmentStatus,
    NewAppointment, RescheduleRequest, UpdateAppointmentRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

/// The clinician's view of the appointments table.
pub struct AgendaService {
    supabase: Arc<SupabaseClient>,
    lifecycle: AppointmentLifecycleService,
}

pub fn list_query(query: &AppointmentQuery) -> String {
    let mut parts = Vec::new();
    if let Some(from) = query.from {
        parts.push(format!("date=gte.{}", from));
    }
    if let Some(to) = query.to {
        parts.push(format!("date=lte.{}", to));
    }
    if let Some(psychologist_id) = query.psychologist_id {
        parts.push(format!("psychologist_id=eq.{}", psychologist_id));
    }
    parts.push("order=date.asc,start_time.asc".to_string());
    parts.join("&")
}

impl AgendaService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            supabase,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub async fn list_appointments(
        &self,
        query: &AppointmentQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let filter = list_query(query);
        debug!("Listing appointments with {}", filter);

        let appointments = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<Appointment>(tables::APPOINTMENTS, &filter, Some(auth_token)))
            .await?;
        Ok(appointments)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let filter = format!("id=eq.{}", appointment_id);
        let mut rows = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<Appointment>(tables::APPOINTMENTS, &filter, Some(auth_token)))
            .await?;

        if rows.is_empty() {
            return Err(AppointmentError::NotFound);
        }
        Ok(rows.swap_remove(0))
    }

    pub async fn create_appointment(
        &self,
        new_appointment: NewAppointment,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        new_appointment.validate()?;
        let row = json!(new_appointment);

        let appointment: Appointment = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.insert(tables::APPOINTMENTS, row.clone(), Some(auth_token)))
            .await?;

        info!("Appointment {} created for {} {}", appointment.id, appointment.date, appointment.start_time);
        Ok(appointment)
    }

    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        patch: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if patch.start_time.is_some() || patch.end_time.is_some() || patch.status.is_some() {
            let current = self.get_appointment(appointment_id, auth_token).await?;

            let start = patch.start_time.as_deref().unwrap_or(&current.start_time);
            let end = patch.end_time.as_deref().unwrap_or(&current.end_time);
            validate_time_range(start, end)?;

            if let Some(status) = patch.status.filter(|s| *s != current.status) {
                self.lifecycle.validate_status_transition(current.status, status)?;
            }
        }

        self.patch(appointment_id, json!(patch), auth_token).await
    }

    pub async fn delete_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<(), AppointmentError> {
        let filter = format!("id=eq.{}", appointment_id);
        self.supabase
            .retry_policy()
            .execute(|| self.supabase.delete(tables::APPOINTMENTS, &filter, Some(auth_token)))
            .await?;

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    pub async fn confirm(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Confirmed, auth_token).await
    }

    pub async fn cancel(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Canceled, auth_token).await
    }

    pub async fn complete(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        self.transition(appointment_id, AppointmentStatus::Completed, auth_token).await
    }

    /// Moves the appointment to a new date and time and puts it back into `agendado`.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        validate_time_range(&request.start_time, &request.end_time)?;

        let current = self.get_appointment(appointment_id, auth_token).await?;
        if !self.lifecycle.can_reschedule(current.status) {
            return Err(AppointmentError::InvalidStatusTransition {
                from: current.status,
                to: AppointmentStatus::Scheduled,
            });
        }

        let patch = json!({
            "date": request.date,
            "start_time": request.start_time,
            "end_time": request.end_time,
            "status": AppointmentStatus::Scheduled,
        });
        let updated = self.patch(appointment_id, patch, auth_token).await?;

        info!("Appointment {} rescheduled to {} {}", appointment_id, updated.date, updated.start_time);
        Ok(updated)
    }

    /// Upcoming appointments booked through the public site.
    pub async fn list_site_bookings(
        &self,
        psychologist_id: Option<Uuid>,
        from: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let query = AppointmentQuery {
            from: Some(from),
            to: None,
            psychologist_id,
        };
        let filter = format!(
            "{}&patient_id=is.null&patient_name_manual=not.is.null",
            list_query(&query)
        );

        let appointments = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.select::<Appointment>(tables::APPOINTMENTS, &filter, Some(auth_token)))
            .await?;

        Ok(appointments.into_iter().filter(Appointment::is_walk_in).collect())
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        target: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle.validate_status_transition(current.status, target)?;

        let updated = self
            .patch(appointment_id, json!({ "status": target }), auth_token)
            .await?;

        info!("Appointment {} moved from {} to {}", appointment_id, current.status, target);
        Ok(updated)
    }

    async fn patch(
        &self,
        appointment_id: Uuid,
        patch: serde_json::Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let filter = format!("id=eq.{}", appointment_id);
        self.supabase
            .retry_policy()
            .execute(|| self.supabase.update::<Appointment>(tables::APPOINTMENTS, &filter, patch.clone(), Some(auth_token)))
            .await
            .map_err(|e| match e {
                BackendError::NoRows => AppointmentError::NotFound,
                other => other.into(),
            })
    }
}
