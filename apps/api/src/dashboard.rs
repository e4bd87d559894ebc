use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Serialize;
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentQuery};
use appointment_cell::services::agenda::AgendaService;
use finance_cell::models::{FinancialSummary, Transaction, TransactionQuery};
use finance_cell::services::{summarize, FinanceService};
use patient_cell::models::{Patient, PatientQuery};
use patient_cell::services::PatientService;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

const RECENT_PATIENTS: usize = 4;

#[derive(Debug, Serialize)]
pub struct DashboardOverview {
    pub active_patients: usize,
    pub revenue: f64,
    pub finance: FinancialSummary,
    pub week_sessions: usize,
    pub recent_patients: Vec<Patient>,
}

/// Sunday that opens the week containing `today`.
fn start_of_week(today: NaiveDate) -> NaiveDate {
    today - Duration::days(today.weekday().num_days_from_sunday() as i64)
}

pub fn build_overview(
    patients: Vec<Patient>,
    transactions: &[Transaction],
    appointments: &[Appointment],
    today: NaiveDate,
) -> DashboardOverview {
    let week_start = start_of_week(today);
    let finance = summarize(transactions);

    DashboardOverview {
        active_patients: patients.iter().filter(|p| p.is_active()).count(),
        revenue: finance.revenue,
        finance,
        week_sessions: appointments.iter().filter(|a| a.date >= week_start).count(),
        recent_patients: patients.into_iter().take(RECENT_PATIENTS).collect(),
    }
}

#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<DashboardOverview>, AppError> {
    let psychologist_id = Uuid::parse_str(&user.id).ok();
    let token = auth.token();

    let patients = PatientService::new(state.supabase.clone());
    let finance = FinanceService::new(state.supabase.clone());
    let agenda = AgendaService::new(state.supabase.clone());

    let patient_query = PatientQuery { psychologist_id };
    let transaction_query = TransactionQuery { psychologist_id };
    let appointment_query = AppointmentQuery {
        psychologist_id,
        ..Default::default()
    };

    let (patients, transactions, appointments) = tokio::try_join!(
        async { patients.list_patients(&patient_query, token).await.map_err(AppError::from) },
        async { finance.list_transactions(&transaction_query, token).await.map_err(AppError::from) },
        async { agenda.list_appointments(&appointment_query, token).await.map_err(AppError::from) },
    )?;

    let today = Utc::now().date_naive();
    Ok(Json(build_overview(patients, &transactions, &appointments, today)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patient(status: &str) -> Patient {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "psychologist_id": null,
            "name": "Ana",
            "status": status
        }))
        .unwrap()
    }

    fn appointment(date: &str) -> Appointment {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "psychologist_id": Uuid::new_v4(),
            "date": date,
            "start_time": "14:00",
            "end_time": "15:00",
            "status": "agendado"
        }))
        .unwrap()
    }

    #[test]
    fn test_week_starts_on_sunday() {
        let wednesday = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        assert_eq!(start_of_week(wednesday), NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());

        let sunday = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert_eq!(start_of_week(sunday), sunday);
    }

    #[test]
    fn test_overview_counts() {
        let patients = vec![
            patient("ativo"),
            patient("ativo"),
            patient("inativo"),
            patient("ativo"),
            patient("ativo"),
        ];
        let appointments = vec![appointment("2024-05-31"), appointment("2024-06-03"), appointment("2024-06-07")];
        let today = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();

        let overview = build_overview(patients, &[], &appointments, today);
        assert_eq!(overview.active_patients, 4);
        assert_eq!(overview.week_sessions, 2);
        assert_eq!(overview.recent_patients.len(), 4);
        assert_eq!(overview.revenue, 0.0);
    }
}
