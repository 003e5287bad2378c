use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::domain::{
    AssignmentId, AssignmentRole, AssignmentStatus, CompletionOutcome, RescueAssignment,
    ReportId, ReportStatus, VolunteerId,
};
use super::error::RescueError;
use super::locks::ReportLocks;
use super::qualification::QualificationEvaluator;
use super::repository::{
    AssignmentRepository, CompletionNotice, CompletionNotifier, ReportStore, VolunteerStore,
};

static ASSIGNMENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_assignment_id() -> AssignmentId {
    let id = ASSIGNMENT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    AssignmentId(format!("asg-{id:06}"))
}

/// Forward-only actions on an existing assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Complete,
    Cancel,
}

impl Transition {
    pub const fn label(self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Complete => "complete",
            Transition::Cancel => "cancel",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The only legal edges of the assignment state machine. Terminal states have none.
pub fn next_status(from: AssignmentStatus, transition: Transition) -> Option<AssignmentStatus> {
    match (from, transition) {
        (AssignmentStatus::Accepted, Transition::Start) => Some(AssignmentStatus::InProgress),
        (AssignmentStatus::Accepted | AssignmentStatus::InProgress, Transition::Complete) => {
            Some(AssignmentStatus::Completed)
        }
        (AssignmentStatus::Accepted | AssignmentStatus::InProgress, Transition::Cancel) => {
            Some(AssignmentStatus::Cancelled)
        }
        (AssignmentStatus::InProgress, Transition::Start)
        | (AssignmentStatus::Completed | AssignmentStatus::Cancelled, _) => None,
    }
}

/// Collaborators the engine reads from and writes to.
#[derive(Clone)]
pub struct RescueStores {
    pub reports: Arc<dyn ReportStore>,
    pub volunteers: Arc<dyn VolunteerStore>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub notifier: Arc<dyn CompletionNotifier>,
}

/// Owns the assignment state machine and the at-most-one-active-claim-per-report guarantee.
pub struct AssignmentLifecycleManager {
    stores: RescueStores,
    evaluator: QualificationEvaluator,
    locks: ReportLocks,
}

impl AssignmentLifecycleManager {
    pub fn new(stores: RescueStores) -> Self {
        Self {
            stores,
            evaluator: QualificationEvaluator::new(),
            locks: ReportLocks::new(),
        }
    }

    /// Claim an open report. Serialized per report; qualification is re-evaluated here from
    /// the volunteer store, never taken from a cached read.
    pub fn claim(
        &self,
        report_id: &ReportId,
        volunteer_id: &VolunteerId,
        role: AssignmentRole,
        notes: &str,
    ) -> Result<RescueAssignment, RescueError> {
        let outcome = self.locks.with_lock(report_id, || -> Result<_, RescueError> {
            let report = self
                .stores
                .reports
                .fetch(report_id)?
                .ok_or_else(|| RescueError::ReportNotFound(report_id.clone()))?;

            if report.status == ReportStatus::Resolved {
                return Err(RescueError::ReportClosed(report_id.clone()));
            }

            if self
                .stores
                .assignments
                .active_for_report(report_id)?
                .is_some()
            {
                return Err(RescueError::AlreadyClaimed {
                    report_id: report_id.clone(),
                });
            }

            let trainings = self
                .stores
                .volunteers
                .completed_trainings(volunteer_id)?
                .ok_or_else(|| RescueError::VolunteerNotFound(volunteer_id.clone()))?;

            let qualification = self.evaluator.evaluate_trainings(&report, &trainings);
            if !qualification.permits_claim() {
                return Err(RescueError::NotQualified {
                    report_id: report_id.clone(),
                    missing_required: qualification.missing_required,
                    message: qualification.message,
                });
            }

            let assignment = RescueAssignment::accepted(
                next_assignment_id(),
                report_id.clone(),
                volunteer_id.clone(),
                role,
                notes,
                Utc::now(),
            );
            self.stores
                .reports
                .set_status(report_id, ReportStatus::Assigned)?;
            let stored = match self.stores.assignments.insert(assignment) {
                Ok(stored) => stored,
                Err(err) => {
                    self.restore_report(report_id, report.status);
                    return Err(err.into());
                }
            };

            info!(
                assignment_id = %stored.id,
                report_id = %report_id,
                volunteer_id = %volunteer_id,
                role = role.label(),
                tier = qualification.tier.label(),
                "rescue claimed"
            );
            Ok(stored)
        });

        // Unknown and resolved reports never take another claim.
        if matches!(
            outcome,
            Err(RescueError::ReportNotFound(_) | RescueError::ReportClosed(_))
        ) {
            self.locks.reclaim(report_id);
        }
        outcome
    }

    /// `ACCEPTED -> IN_PROGRESS`, only for the assigned volunteer.
    pub fn start(
        &self,
        assignment_id: &AssignmentId,
        volunteer_id: &VolunteerId,
    ) -> Result<RescueAssignment, RescueError> {
        let report_id = self.report_for(assignment_id)?;

        self.locks.with_lock(&report_id, || -> Result<_, RescueError> {
            let mut assignment = self.fetch_assignment(assignment_id)?;
            if &assignment.volunteer_id != volunteer_id {
                return Err(RescueError::InvalidTransition {
                    assignment_id: assignment_id.clone(),
                    detail: format!("assignment is not held by volunteer {volunteer_id}"),
                });
            }

            assignment.status = advance(&assignment, Transition::Start)?;
            assignment.started_at = Some(Utc::now());
            self.stores.assignments.update(assignment.clone())?;

            info!(assignment_id = %assignment.id, report_id = %report_id, "rescue started");
            Ok(assignment)
        })
    }

    /// `ACCEPTED | IN_PROGRESS -> COMPLETED`. Notes are mandatory.
    pub fn complete(
        &self,
        assignment_id: &AssignmentId,
        outcome: CompletionOutcome,
        notes: &str,
    ) -> Result<RescueAssignment, RescueError> {
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(RescueError::Validation(
                "completion notes are required".to_string(),
            ));
        }

        let report_id = self.report_for(assignment_id)?;

        let completed = self.locks.with_lock(&report_id, || -> Result<_, RescueError> {
            let mut assignment = self.fetch_assignment(assignment_id)?;
            assignment.status = advance(&assignment, Transition::Complete)?;
            assignment.outcome = Some(outcome);
            assignment.completion_notes = Some(notes.to_string());
            assignment.completed_at = Some(Utc::now());

            let report_status = if outcome.resolves_report() {
                ReportStatus::Resolved
            } else {
                ReportStatus::Open
            };
            self.stores.reports.set_status(&report_id, report_status)?;
            if let Err(err) = self.stores.assignments.update(assignment.clone()) {
                self.restore_report(&report_id, ReportStatus::Assigned);
                return Err(err.into());
            }
            Ok(assignment)
        })?;

        if outcome.resolves_report() {
            self.locks.reclaim(&report_id);
        }

        info!(
            assignment_id = %completed.id,
            report_id = %report_id,
            outcome = outcome.label(),
            "rescue completed"
        );

        let notice = CompletionNotice {
            assignment_id: completed.id.clone(),
            report_id: completed.report_id.clone(),
            volunteer_id: completed.volunteer_id.clone(),
            outcome,
        };
        if let Err(err) = self.stores.notifier.assignment_completed(notice) {
            warn!(assignment_id = %completed.id, error = %err, "completion notice not delivered");
        }

        Ok(completed)
    }

    /// Any non-terminal state -> `CANCELLED`; the report reopens for re-dispatch.
    pub fn cancel(
        &self,
        assignment_id: &AssignmentId,
        reason: &str,
    ) -> Result<RescueAssignment, RescueError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(RescueError::Validation(
                "a cancellation reason is required".to_string(),
            ));
        }

        let report_id = self.report_for(assignment_id)?;

        self.locks.with_lock(&report_id, || -> Result<_, RescueError> {
            let mut assignment = self.fetch_assignment(assignment_id)?;
            assignment.status = advance(&assignment, Transition::Cancel)?;
            assignment.completion_notes = Some(reason.to_string());
            assignment.cancelled_at = Some(Utc::now());
            self.stores
                .reports
                .set_status(&report_id, ReportStatus::Open)?;
            if let Err(err) = self.stores.assignments.update(assignment.clone()) {
                self.restore_report(&report_id, ReportStatus::Assigned);
                return Err(err.into());
            }

            info!(
                assignment_id = %assignment.id,
                report_id = %report_id,
                reason,
                "rescue cancelled"
            );
            Ok(assignment)
        })
    }

    pub fn assignment(
        &self,
        assignment_id: &AssignmentId,
    ) -> Result<RescueAssignment, RescueError> {
        self.fetch_assignment(assignment_id)
    }

    pub(crate) fn tracked_reports(&self) -> usize {
        self.locks.len()
    }

    fn fetch_assignment(
        &self,
        assignment_id: &AssignmentId,
    ) -> Result<RescueAssignment, RescueError> {
        self.stores
            .assignments
            .fetch(assignment_id)?
            .ok_or_else(|| RescueError::AssignmentNotFound(assignment_id.clone()))
    }

    /// Undo a report status write whose paired assignment write failed.
    fn restore_report(&self, report_id: &ReportId, status: ReportStatus) {
        if let Err(err) = self.stores.reports.set_status(report_id, status) {
            error!(
                report_id = %report_id,
                status = status.label(),
                error = %err,
                "report status rollback failed"
            );
        }
    }

    // An assignment's report never changes, so it can be read before taking the lock.
    fn report_for(&self, assignment_id: &AssignmentId) -> Result<ReportId, RescueError> {
        self.fetch_assignment(assignment_id)
            .map(|assignment| assignment.report_id)
    }
}

fn advance(
    assignment: &RescueAssignment,
    transition: Transition,
) -> Result<AssignmentStatus, RescueError> {
    next_status(assignment.status, transition).ok_or_else(|| RescueError::InvalidTransition {
        assignment_id: assignment.id.clone(),
        detail: format!(
            "cannot {} while {}",
            transition,
            assignment.status.label()
        ),
    })
}
