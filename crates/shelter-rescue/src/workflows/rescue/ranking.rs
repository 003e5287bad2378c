use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{GeoPoint, IncidentReport, VolunteerProfile};
use super::qualification::{QualificationEvaluator, QualificationResult};

/// One open report annotated for a specific volunteer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedRescue {
    pub report: IncidentReport,
    pub qualification: QualificationResult,
    /// 1-based position in the ranked listing.
    pub priority_rank: usize,
    pub priority_score: u16,
    pub age_minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl RankedRescue {
    pub fn can_claim(&self) -> bool {
        self.qualification.permits_claim()
    }
}

/// Advisory ordering of open reports. Confers no locking or reservation.
///
/// Precedence, each level only breaking ties of the previous one:
/// 1) urgency, `EMERGENCY` first
/// 2) qualification band, perfect/good above caution above not_recommended
/// 3) age, oldest first
/// 4) report id, for a stable total order
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityRanker {
    evaluator: QualificationEvaluator,
}

impl PriorityRanker {
    pub fn new() -> Self {
        Self {
            evaluator: QualificationEvaluator::new(),
        }
    }

    /// Evaluate and rank reports for a volunteer.
    pub fn rank(
        &self,
        reports: Vec<IncidentReport>,
        volunteer: &VolunteerProfile,
        now: DateTime<Utc>,
    ) -> Vec<RankedRescue> {
        let evaluated = reports
            .into_iter()
            .map(|report| {
                let qualification = self.evaluator.evaluate(&report, volunteer);
                (report, qualification)
            })
            .collect();
        self.rank_evaluated(evaluated, volunteer.location, now)
    }

    /// Rank reports whose qualification has already been computed (possibly from cache).
    /// `not_recommended` entries are kept so callers can prompt for training.
    pub fn rank_evaluated(
        &self,
        mut evaluated: Vec<(IncidentReport, QualificationResult)>,
        origin: Option<GeoPoint>,
        now: DateTime<Utc>,
    ) -> Vec<RankedRescue> {
        evaluated.sort_by(|a, b| compare(a, b));

        evaluated
            .into_iter()
            .enumerate()
            .map(|(index, (report, qualification))| {
                let priority_score = priority_score(&report, &qualification);
                let age_minutes = now
                    .signed_duration_since(report.created_at)
                    .num_minutes()
                    .max(0);
                let distance_km = origin.map(|point| point.distance_km(&report.location));
                RankedRescue {
                    report,
                    qualification,
                    priority_rank: index + 1,
                    priority_score,
                    age_minutes,
                    distance_km,
                }
            })
            .collect()
    }
}

pub(crate) fn priority_score(report: &IncidentReport, qualification: &QualificationResult) -> u16 {
    report.urgency.weight() * 10 + qualification.tier.band()
}

pub(crate) fn compare(
    a: &(IncidentReport, QualificationResult),
    b: &(IncidentReport, QualificationResult),
) -> Ordering {
    let (report_a, qual_a) = a;
    let (report_b, qual_b) = b;

    report_b
        .urgency
        .cmp(&report_a.urgency)
        .then_with(|| qual_b.tier.band().cmp(&qual_a.tier.band()))
        .then_with(|| report_a.created_at.cmp(&report_b.created_at))
        .then_with(|| report_a.id.cmp(&report_b.id))
}
