//! Rescue assignment and qualification matching.
//!
//! Reads flow report store -> qualification evaluator -> priority ranker -> dispatch
//! coordinator. Writes converge on the lifecycle manager, which serializes work per report.

pub mod domain;
pub mod error;
pub mod lifecycle;
mod locks;
pub mod qualification;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AssignmentId, AssignmentRole, AssignmentStatus, CompletionOutcome, GeoPoint, IncidentReport,
    RescueAssignment, ReportId, ReportStatus, SkillTag, TrainingRequirement, UrgencyLevel,
    VolunteerId, VolunteerProfile,
};
pub use error::RescueError;
pub use lifecycle::{next_status, AssignmentLifecycleManager, RescueStores, Transition};
pub use qualification::{
    QualificationCache, QualificationEvaluator, QualificationResult, QualificationTier,
};
pub use ranking::{PriorityRanker, RankedRescue};
pub use repository::{
    AssignmentRepository, CompletionNotice, CompletionNotifier, NotifyError, ReportStore,
    RepositoryError, VolunteerStore,
};
pub use router::rescue_router;
pub use service::{DispatchCoordinator, RefreshSummary};
