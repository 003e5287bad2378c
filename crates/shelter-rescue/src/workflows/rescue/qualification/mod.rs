mod cache;
mod coverage;

pub use cache::QualificationCache;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{IncidentReport, SkillTag, UrgencyLevel, VolunteerProfile};

/// Computed fitness of a volunteer for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationTier {
    Perfect,
    Good,
    Caution,
    NotRecommended,
}

impl QualificationTier {
    pub const fn label(self) -> &'static str {
        match self {
            QualificationTier::Perfect => "perfect",
            QualificationTier::Good => "good",
            QualificationTier::Caution => "caution",
            QualificationTier::NotRecommended => "not_recommended",
        }
    }

    /// Ranking band. `Perfect` and `Good` share the top band.
    pub const fn band(self) -> u16 {
        match self {
            QualificationTier::Perfect | QualificationTier::Good => 2,
            QualificationTier::Caution => 1,
            QualificationTier::NotRecommended => 0,
        }
    }

    /// Missing required training is a hard block on claiming.
    pub const fn permits_claim(self) -> bool {
        match self {
            QualificationTier::Perfect | QualificationTier::Good | QualificationTier::Caution => {
                true
            }
            QualificationTier::NotRecommended => false,
        }
    }
}

/// Derived evaluation of one (report, volunteer) pair. Never the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationResult {
    pub tier: QualificationTier,
    pub message: String,
    pub satisfied_required: Vec<SkillTag>,
    pub missing_required: Vec<SkillTag>,
    pub satisfied_recommended: Vec<SkillTag>,
    pub missing_recommended: Vec<SkillTag>,
}

impl QualificationResult {
    pub fn permits_claim(&self) -> bool {
        self.tier.permits_claim()
    }
}

/// Stateless, deterministic evaluator of training coverage.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualificationEvaluator;

impl QualificationEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        report: &IncidentReport,
        volunteer: &VolunteerProfile,
    ) -> QualificationResult {
        self.evaluate_trainings(report, &volunteer.completed_trainings)
    }

    pub fn evaluate_trainings(
        &self,
        report: &IncidentReport,
        completed: &BTreeSet<SkillTag>,
    ) -> QualificationResult {
        let coverage = coverage::partition(report, completed);

        let (tier, message) = if !coverage.missing_required.is_empty() {
            (
                QualificationTier::NotRecommended,
                format!(
                    "Complete required training first: {}",
                    coverage::labels(&coverage.missing_required)
                ),
            )
        } else if !coverage.missing_recommended.is_empty() {
            (
                QualificationTier::Caution,
                format!(
                    "Qualified, but recommended training is missing: {}",
                    coverage::labels(&coverage.missing_recommended)
                ),
            )
        } else if report.urgency == UrgencyLevel::Emergency {
            (
                QualificationTier::Perfect,
                "Perfect match: all listed training complete for this emergency".to_string(),
            )
        } else if report.requirements.is_empty() {
            (
                QualificationTier::Good,
                "Good match: no special training required".to_string(),
            )
        } else {
            (
                QualificationTier::Good,
                "Good match: all listed training complete".to_string(),
            )
        };

        QualificationResult {
            tier,
            message,
            satisfied_required: coverage::tags(&coverage.satisfied_required),
            missing_required: coverage::tags(&coverage.missing_required),
            satisfied_recommended: coverage::tags(&coverage.satisfied_recommended),
            missing_recommended: coverage::tags(&coverage.missing_recommended),
        }
    }
}
