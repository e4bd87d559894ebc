// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};

use shared_config::AppConfig;
use shared_database::{tables, SupabaseClient};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookingConfirmation, BookingRequest,
    NewAppointment, SessionType,
};
use crate::services::availability::AvailabilityService;
use crate::services::messaging;

const MIN_PHONE_DIGITS: usize = 10;

pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Parses a canonical `HH:00` slot and returns its hour.
pub fn parse_slot_hour(slot: &str) -> Option<u32> {
    let (hour, minutes) = slot.split_once(':')?;
    if hour.len() != 2 || minutes != "00" || !hour.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    hour.parse::<u32>().ok().filter(|h| *h < 23)
}

/// Checks the request before anything is sent to the backend and returns the
/// slot hour.
pub fn validate_booking(request: &BookingRequest) -> Result<u32, AppointmentError> {
    if request.name.trim().is_empty() {
        return Err(AppointmentError::ValidationError("Name is required".to_string()));
    }

    if digits_only(&request.phone).len() < MIN_PHONE_DIGITS {
        return Err(AppointmentError::ValidationError(format!(
            "Phone must have at least {} digits",
            MIN_PHONE_DIGITS
        )));
    }

    parse_slot_hour(&request.slot)
        .ok_or_else(|| AppointmentError::InvalidTime(format!("Invalid slot: {}", request.slot)))
}

/// The row a public booking writes: confirmed, one hour long, no patient record.
pub fn build_walk_in_appointment(request: &BookingRequest, hour: u32) -> NewAppointment {
    NewAppointment {
        psychologist_id: request.psychologist_id,
        patient_id: None,
        patient_name_manual: Some(request.name.trim().to_string()),
        phone_manual: Some(digits_only(&request.phone)),
        date: request.date,
        start_time: request.slot.clone(),
        end_time: format!("{:02}:00", hour + 1),
        status: AppointmentStatus::Confirmed,
        session_type: SessionType::Individual,
        notes: Some(format!("Agendado via site. WhatsApp: {}", request.phone)),
        location: None,
    }
}

pub struct PublicBookingService {
    supabase: Arc<SupabaseClient>,
    availability: AvailabilityService,
    clinic_number: String,
}

impl PublicBookingService {
    pub fn new(config: &AppConfig, supabase: Arc<SupabaseClient>) -> Self {
        Self {
            availability: AvailabilityService::new(Arc::clone(&supabase)),
            supabase,
            clinic_number: config.clinic_whatsapp_number.clone(),
        }
    }

    pub fn with_availability(mut self, availability: AvailabilityService) -> Self {
        self.availability = availability;
        self
    }

    pub fn clinic_number(&self) -> &str {
        &self.clinic_number
    }

    /// Books a free slot for someone without an account. The slot is checked
    /// again right before the insert; a concurrent booking between the check
    /// and the write is not prevented.
    pub async fn book_slot(&self, request: BookingRequest) -> Result<BookingConfirmation, AppointmentError> {
        let hour = validate_booking(&request)?;

        let free = self
            .availability
            .get_available_slots(request.date, Some(request.psychologist_id), None)
            .await?;

        if !free.contains(&request.slot) {
            warn!("Slot {} on {} is no longer free", request.slot, request.date);
            return Err(AppointmentError::SlotNotAvailable);
        }

        let new_appointment = build_walk_in_appointment(&request, hour);
        new_appointment.validate()?;
        let row = json!(new_appointment);

        let appointment: Appointment = self
            .supabase
            .retry_policy()
            .execute(|| self.supabase.insert(tables::APPOINTMENTS, row.clone(), None))
            .await?;

        info!("Site booking {} created for {} at {}", appointment.id, appointment.date, request.slot);

        let whatsapp_url = messaging::booking_confirmation_request(
            &self.clinic_number,
            &request.name,
            request.date,
            &request.slot,
        );

        Ok(BookingConfirmation {
            appointment,
            whatsapp_url,
        })
    }
}
