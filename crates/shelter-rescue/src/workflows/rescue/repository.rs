use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{
    AssignmentId, CompletionOutcome, IncidentReport, RescueAssignment, ReportId, ReportStatus,
    SkillTag, VolunteerId, VolunteerProfile,
};

/// Report store owned by the intake subsystem.
pub trait ReportStore: Send + Sync {
    fn open_reports(&self) -> Result<Vec<IncidentReport>, RepositoryError>;
    fn fetch(&self, id: &ReportId) -> Result<Option<IncidentReport>, RepositoryError>;
    fn set_status(&self, id: &ReportId, status: ReportStatus) -> Result<(), RepositoryError>;
}

/// Read-only access to volunteer profiles.
pub trait VolunteerStore: Send + Sync {
    fn profile(&self, id: &VolunteerId) -> Result<Option<VolunteerProfile>, RepositoryError>;

    /// `None` when the volunteer is unknown.
    fn completed_trainings(
        &self,
        id: &VolunteerId,
    ) -> Result<Option<BTreeSet<SkillTag>>, RepositoryError> {
        Ok(self
            .profile(id)?
            .map(|profile| profile.completed_trainings))
    }
}

/// Storage abstraction for assignments, so the lifecycle manager can be exercised in isolation.
pub trait AssignmentRepository: Send + Sync {
    fn insert(&self, assignment: RescueAssignment) -> Result<RescueAssignment, RepositoryError>;
    fn update(&self, assignment: RescueAssignment) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &AssignmentId) -> Result<Option<RescueAssignment>, RepositoryError>;
    fn active_for_report(
        &self,
        report_id: &ReportId,
    ) -> Result<Option<RescueAssignment>, RepositoryError>;
    /// Every assignment ever made for the report, oldest first.
    fn for_report(&self, report_id: &ReportId) -> Result<Vec<RescueAssignment>, RepositoryError>;
    fn for_volunteer(
        &self,
        volunteer_id: &VolunteerId,
    ) -> Result<Vec<RescueAssignment>, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook to the reward/points collaborator. Fire-and-forget.
pub trait CompletionNotifier: Send + Sync {
    fn assignment_completed(&self, notice: CompletionNotice) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionNotice {
    pub assignment_id: AssignmentId,
    pub report_id: ReportId,
    pub volunteer_id: VolunteerId,
    pub outcome: CompletionOutcome,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
