use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use clinical_cell::services::{DiagnosticService, EvolutionService};
use patient_cell::models::Patient;
use shared_database::SupabaseClient;

use crate::models::{ParentView, PortalAccess, PortalError, PortalPatient, PortalType, StudentProgress, StudentView, Task};
use crate::services::{AccessService, AchievementService, TaskService};

/// Read models behind the two access-code portals. Every call runs as the
/// anonymous role.
pub struct PortalViewService {
    supabase: Arc<SupabaseClient>,
    access: AccessService,
    tasks: TaskService,
}

impl PortalViewService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            access: AccessService::new(supabase.clone()),
            tasks: TaskService::new(supabase.clone()),
            supabase,
        }
    }

    pub async fn parent_view(&self, code: &str) -> Result<ParentView, PortalError> {
        let access = self.access.open_portal(code, PortalType::Parents).await?;
        let (access_code, patient_id, embedded) = split(access)?;

        let evolutions = EvolutionService::new(self.supabase.clone());
        let diagnostics = DiagnosticService::new(self.supabase.clone());

        let (evolutions, diagnostics) = tokio::try_join!(
            async { evolutions.list_evolutions(patient_id, None).await.map_err(PortalError::from) },
            async { diagnostics.list_diagnostics(patient_id, true, None).await.map_err(PortalError::from) },
        )?;

        debug!(
            "Parent portal {}: {} evolutions, {} shared reports",
            access_code,
            evolutions.len(),
            diagnostics.len()
        );

        Ok(ParentView {
            access_code,
            patient: embedded.patient,
            psychologist: embedded.psychologist,
            evolutions,
            diagnostics,
        })
    }

    pub async fn student_view(&self, code: &str) -> Result<StudentView, PortalError> {
        let access = self.access.open_portal(code, PortalType::Student).await?;
        let (access_code, patient_id, embedded) = split(access)?;

        let achievements = AchievementService::new(self.supabase.clone());

        let (tasks, catalogue, unlocked) = tokio::try_join!(
            self.tasks.list_tasks(patient_id, None),
            achievements.list_achievements(None),
            achievements.list_unlocked(patient_id, None),
        )?;

        let progress = StudentProgress::compute(&embedded.patient, &tasks);

        Ok(StudentView {
            access_code,
            patient: embedded.patient,
            psychologist: embedded.psychologist,
            tasks,
            achievements: catalogue,
            unlocked,
            progress,
        })
    }

    /// Completion from the student portal. The task must belong to the
    /// patient behind the code.
    pub async fn complete_student_task(&self, code: &str, task_id: Uuid) -> Result<(Task, Patient), PortalError> {
        let access = self.access.open_portal(code, PortalType::Student).await?;

        let task = self.tasks.get_task(task_id, None).await?;
        if task.patient_id != access.patient_id {
            return Err(PortalError::TaskNotFound);
        }

        self.tasks.complete_task(task, None).await
    }
}

fn split(access: PortalAccess) -> Result<(String, Uuid, PortalPatient), PortalError> {
    let embedded = access.patient.ok_or(PortalError::NotFound)?;
    Ok((access.access_code, access.patient_id, embedded))
}
