//! PostgREST table names used by the clinic.

pub const PROFILES: &str = "profiles_psico";
pub const PATIENTS: &str = "patients_psico";
pub const APPOINTMENTS: &str = "appointments_psico";
pub const TRANSACTIONS: &str = "transactions_psico";
pub const EVOLUTIONS: &str = "evolutions_psico";
pub const DIAGNOSTICS: &str = "diagnostics_psico";
pub const TASKS: &str = "tasks_psico";
pub const ACHIEVEMENTS: &str = "achievements_psico";
pub const PATIENT_ACHIEVEMENTS: &str = "patient_achievements_psico";
pub const PORTAL_ACCESS: &str = "portal_access_psico";

pub fn rest_path(table: &str) -> String {
    format!("/rest/v1/{}", table)
}
