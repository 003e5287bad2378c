use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::DispatchConfig;

use super::domain::{
    AssignmentId, AssignmentRole, CompletionOutcome, RescueAssignment, ReportId, VolunteerId,
    VolunteerProfile,
};
use super::error::RescueError;
use super::lifecycle::{AssignmentLifecycleManager, RescueStores};
use super::qualification::{QualificationCache, QualificationEvaluator};
use super::ranking::{PriorityRanker, RankedRescue};

/// Result of forcing a volunteer's qualifications to be recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub volunteer_id: VolunteerId,
    pub updated_count: usize,
    pub invalidated_count: usize,
}

/// Facade composing the evaluator and ranker into the read path and delegating every state
/// change to the lifecycle manager.
pub struct DispatchCoordinator {
    stores: RescueStores,
    lifecycle: AssignmentLifecycleManager,
    evaluator: QualificationEvaluator,
    ranker: PriorityRanker,
    cache: QualificationCache,
}

impl DispatchCoordinator {
    pub fn new(stores: RescueStores, config: &DispatchConfig) -> Self {
        Self {
            lifecycle: AssignmentLifecycleManager::new(stores.clone()),
            stores,
            evaluator: QualificationEvaluator::new(),
            ranker: PriorityRanker::new(),
            cache: QualificationCache::new(config.qualification_ttl),
        }
    }

    /// Ranked, qualification-annotated open reports. Side-effect free apart from caching.
    pub fn list_open_rescues(
        &self,
        volunteer_id: &VolunteerId,
    ) -> Result<Vec<RankedRescue>, RescueError> {
        let outcome = self.list_inner(volunteer_id);
        log_outcome("list_open_rescues", &outcome);
        outcome
    }

    pub fn accept_rescue(
        &self,
        report_id: &ReportId,
        volunteer_id: &VolunteerId,
        role: AssignmentRole,
        notes: &str,
    ) -> Result<RescueAssignment, RescueError> {
        let outcome = self.lifecycle.claim(report_id, volunteer_id, role, notes);
        log_outcome("accept_rescue", &outcome);
        outcome
    }

    pub fn start_rescue(
        &self,
        assignment_id: &AssignmentId,
        volunteer_id: &VolunteerId,
    ) -> Result<RescueAssignment, RescueError> {
        let outcome = self.lifecycle.start(assignment_id, volunteer_id);
        log_outcome("start_rescue", &outcome);
        outcome
    }

    pub fn complete_rescue(
        &self,
        assignment_id: &AssignmentId,
        outcome: CompletionOutcome,
        notes: &str,
    ) -> Result<RescueAssignment, RescueError> {
        let result = self.lifecycle.complete(assignment_id, outcome, notes);
        log_outcome("complete_rescue", &result);
        result
    }

    pub fn cancel_rescue(
        &self,
        assignment_id: &AssignmentId,
        reason: &str,
    ) -> Result<RescueAssignment, RescueError> {
        let outcome = self.lifecycle.cancel(assignment_id, reason);
        log_outcome("cancel_rescue", &outcome);
        outcome
    }

    /// Drop cached results for the volunteer and re-evaluate every open report.
    pub fn refresh_qualifications(
        &self,
        volunteer_id: &VolunteerId,
    ) -> Result<RefreshSummary, RescueError> {
        let outcome = self.refresh_inner(volunteer_id);
        log_outcome("refresh_qualifications", &outcome);
        if let Ok(summary) = &outcome {
            info!(
                volunteer_id = %summary.volunteer_id,
                updated = summary.updated_count,
                invalidated = summary.invalidated_count,
                "qualifications refreshed"
            );
        }
        outcome
    }

    /// "My rescues": every assignment the volunteer has held, newest first.
    pub fn assignments_for_volunteer(
        &self,
        volunteer_id: &VolunteerId,
    ) -> Result<Vec<RescueAssignment>, RescueError> {
        let mut assignments = self.stores.assignments.for_volunteer(volunteer_id)?;
        assignments.sort_by(|a, b| {
            b.assigned_at
                .cmp(&a.assigned_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(assignments)
    }

    /// Audit trail for a report, oldest first.
    pub fn assignment_history(
        &self,
        report_id: &ReportId,
    ) -> Result<Vec<RescueAssignment>, RescueError> {
        if self.stores.reports.fetch(report_id)?.is_none() {
            return Err(RescueError::ReportNotFound(report_id.clone()));
        }
        Ok(self.stores.assignments.for_report(report_id)?)
    }

    pub fn assignment(
        &self,
        assignment_id: &AssignmentId,
    ) -> Result<RescueAssignment, RescueError> {
        self.lifecycle.assignment(assignment_id)
    }

    pub fn cached_qualifications(&self) -> usize {
        self.cache.len()
    }

    fn list_inner(&self, volunteer_id: &VolunteerId) -> Result<Vec<RankedRescue>, RescueError> {
        let volunteer = self.volunteer(volunteer_id)?;
        let reports = self.stores.reports.open_reports()?;
        self.cache.purge_expired();

        let evaluated = reports
            .into_iter()
            .map(|report| {
                let qualification = match self.cache.get(&report.id, volunteer_id) {
                    Some(cached) => cached,
                    None => {
                        let fresh = self.evaluator.evaluate(&report, &volunteer);
                        self.cache
                            .insert(report.id.clone(), volunteer_id.clone(), fresh.clone());
                        fresh
                    }
                };
                (report, qualification)
            })
            .collect();

        Ok(self
            .ranker
            .rank_evaluated(evaluated, volunteer.location, Utc::now()))
    }

    fn refresh_inner(&self, volunteer_id: &VolunteerId) -> Result<RefreshSummary, RescueError> {
        let volunteer = self.volunteer(volunteer_id)?;
        let invalidated_count = self.cache.invalidate_volunteer(volunteer_id);

        let reports = self.stores.reports.open_reports()?;
        for report in &reports {
            let fresh = self.evaluator.evaluate(report, &volunteer);
            self.cache
                .insert(report.id.clone(), volunteer_id.clone(), fresh);
        }

        Ok(RefreshSummary {
            volunteer_id: volunteer_id.clone(),
            updated_count: reports.len(),
            invalidated_count,
        })
    }

    fn volunteer(&self, volunteer_id: &VolunteerId) -> Result<VolunteerProfile, RescueError> {
        self.stores
            .volunteers
            .profile(volunteer_id)?
            .ok_or_else(|| RescueError::VolunteerNotFound(volunteer_id.clone()))
    }
}

fn log_outcome<T>(operation: &'static str, outcome: &Result<T, RescueError>) {
    let Err(err) = outcome else {
        return;
    };

    match err {
        RescueError::AlreadyClaimed { .. } | RescueError::NotQualified { .. } => {
            debug!(operation, code = err.code(), error = %err, "request declined");
        }
        RescueError::InvalidTransition { .. } | RescueError::Validation(_) => {
            warn!(operation, code = err.code(), error = %err, "client error");
        }
        RescueError::ReportNotFound(_)
        | RescueError::AssignmentNotFound(_)
        | RescueError::VolunteerNotFound(_)
        | RescueError::ReportClosed(_) => {
            debug!(operation, code = err.code(), error = %err, "request rejected");
        }
        RescueError::Repository(_) => {
            error!(operation, error = %err, "store failure");
        }
    }
}
