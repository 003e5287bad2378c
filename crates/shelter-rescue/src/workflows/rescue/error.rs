use super::domain::{AssignmentId, ReportId, SkillTag, VolunteerId};
use super::repository::RepositoryError;

/// Typed outcomes for every rescue operation.
///
/// `AlreadyClaimed` and `NotQualified` are expected, user-facing results. `InvalidTransition`
/// and `Validation` indicate caller misuse and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum RescueError {
    #[error("report {0} not found")]
    ReportNotFound(ReportId),
    #[error("assignment {0} not found")]
    AssignmentNotFound(AssignmentId),
    #[error("volunteer {0} not found")]
    VolunteerNotFound(VolunteerId),
    #[error("another volunteer has already responded to report {report_id}")]
    AlreadyClaimed { report_id: ReportId },
    #[error("{message}")]
    NotQualified {
        report_id: ReportId,
        missing_required: Vec<SkillTag>,
        message: String,
    },
    #[error("invalid transition for assignment {assignment_id}: {detail}")]
    InvalidTransition {
        assignment_id: AssignmentId,
        detail: String,
    },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("report {0} is already resolved")]
    ReportClosed(ReportId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl RescueError {
    /// Stable machine-readable code for API payloads.
    pub const fn code(&self) -> &'static str {
        match self {
            RescueError::ReportNotFound(_) => "report_not_found",
            RescueError::AssignmentNotFound(_) => "assignment_not_found",
            RescueError::VolunteerNotFound(_) => "volunteer_not_found",
            RescueError::AlreadyClaimed { .. } => "already_claimed",
            RescueError::NotQualified { .. } => "not_qualified",
            RescueError::InvalidTransition { .. } => "invalid_transition",
            RescueError::Validation(_) => "validation_error",
            RescueError::ReportClosed(_) => "report_closed",
            RescueError::Repository(_) => "repository_unavailable",
        }
    }
}
