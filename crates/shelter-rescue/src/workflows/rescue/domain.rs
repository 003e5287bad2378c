use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for filed incident reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportId(pub String);

/// Identifier wrapper for volunteers owned by the volunteer-management subsystem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VolunteerId(pub String);

/// Identifier wrapper for rescue assignments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub String);

/// Training or skill tag such as `basic-handling` or `large-animal`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SkillTag(pub String);

impl SkillTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }
}

macro_rules! display_as_inner {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })*
    };
}

display_as_inner!(ReportId, VolunteerId, AssignmentId, SkillTag);

/// Urgency tier assigned when the report is filed. Declaration order is the priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    Normal,
    High,
    Emergency,
}

impl UrgencyLevel {
    pub const fn label(self) -> &'static str {
        match self {
            UrgencyLevel::Normal => "NORMAL",
            UrgencyLevel::High => "HIGH",
            UrgencyLevel::Emergency => "EMERGENCY",
        }
    }

    pub const fn weight(self) -> u16 {
        match self {
            UrgencyLevel::Normal => 1,
            UrgencyLevel::High => 2,
            UrgencyLevel::Emergency => 3,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Some(UrgencyLevel::Normal),
            "HIGH" => Some(UrgencyLevel::High),
            "EMERGENCY" => Some(UrgencyLevel::Emergency),
            _ => None,
        }
    }
}

/// Approximate WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        Self::EARTH_RADIUS_KM * c
    }
}

/// Training attached to a report, either required (hard gate) or recommended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRequirement {
    pub tag: SkillTag,
    pub required: bool,
    pub label: String,
}

impl TrainingRequirement {
    pub fn required(tag: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            tag: SkillTag::new(tag),
            required: true,
            label: label.into(),
        }
    }

    pub fn recommended(tag: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            tag: SkillTag::new(tag),
            required: false,
            label: label.into(),
        }
    }
}

/// Dispatch status of a report, driven only by assignment outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Open,
    Assigned,
    Resolved,
}

impl ReportStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReportStatus::Open => "OPEN",
            ReportStatus::Assigned => "ASSIGNED",
            ReportStatus::Resolved => "RESOLVED",
        }
    }
}

/// An animal-in-need record filed by an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    pub id: ReportId,
    pub animal_type: String,
    pub condition: String,
    pub urgency: UrgencyLevel,
    pub location: GeoPoint,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub requirements: Vec<TrainingRequirement>,
    pub status: ReportStatus,
}

impl IncidentReport {
    pub fn required_trainings(&self) -> impl Iterator<Item = &TrainingRequirement> {
        self.requirements.iter().filter(|req| req.required)
    }

    pub fn recommended_trainings(&self) -> impl Iterator<Item = &TrainingRequirement> {
        self.requirements.iter().filter(|req| !req.required)
    }
}

/// Read-only view of a volunteer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolunteerProfile {
    pub id: VolunteerId,
    pub display_name: String,
    pub completed_trainings: BTreeSet<SkillTag>,
    pub available: bool,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentRole {
    Primary,
    Backup,
    Transport,
    Medical,
}

impl AssignmentRole {
    pub const fn label(self) -> &'static str {
        match self {
            AssignmentRole::Primary => "PRIMARY",
            AssignmentRole::Backup => "BACKUP",
            AssignmentRole::Transport => "TRANSPORT",
            AssignmentRole::Medical => "MEDICAL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PRIMARY" => Some(AssignmentRole::Primary),
            "BACKUP" => Some(AssignmentRole::Backup),
            "TRANSPORT" => Some(AssignmentRole::Transport),
            "MEDICAL" => Some(AssignmentRole::Medical),
            _ => None,
        }
    }
}

/// Assignment state machine. Assignments start at `Accepted`; a report with no active
/// assignment is the implicit `OPEN` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AssignmentStatus::Accepted => "ACCEPTED",
            AssignmentStatus::InProgress => "IN_PROGRESS",
            AssignmentStatus::Completed => "COMPLETED",
            AssignmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        match self {
            AssignmentStatus::Accepted | AssignmentStatus::InProgress => false,
            AssignmentStatus::Completed | AssignmentStatus::Cancelled => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionOutcome {
    Success,
    Referred,
    AnimalGone,
    UnableToCapture,
}

impl CompletionOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            CompletionOutcome::Success => "SUCCESS",
            CompletionOutcome::Referred => "REFERRED",
            CompletionOutcome::AnimalGone => "ANIMAL_GONE",
            CompletionOutcome::UnableToCapture => "UNABLE_TO_CAPTURE",
        }
    }

    /// Whether the report closes, or reopens for another dispatch attempt.
    pub const fn resolves_report(self) -> bool {
        match self {
            CompletionOutcome::Success
            | CompletionOutcome::Referred
            | CompletionOutcome::AnimalGone => true,
            CompletionOutcome::UnableToCapture => false,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Some(CompletionOutcome::Success),
            "REFERRED" => Some(CompletionOutcome::Referred),
            "ANIMAL_GONE" => Some(CompletionOutcome::AnimalGone),
            "UNABLE_TO_CAPTURE" => Some(CompletionOutcome::UnableToCapture),
            _ => None,
        }
    }
}

/// Binding of one volunteer to one report for a rescue attempt. Never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescueAssignment {
    pub id: AssignmentId,
    pub report_id: ReportId,
    pub volunteer_id: VolunteerId,
    pub role: AssignmentRole,
    pub status: AssignmentStatus,
    pub volunteer_notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CompletionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_notes: Option<String>,
    pub assigned_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl RescueAssignment {
    pub(crate) fn accepted(
        id: AssignmentId,
        report_id: ReportId,
        volunteer_id: VolunteerId,
        role: AssignmentRole,
        notes: &str,
        assigned_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            report_id,
            volunteer_id,
            role,
            status: AssignmentStatus::Accepted,
            volunteer_notes: notes.trim().to_string(),
            outcome: None,
            completion_notes: None,
            assigned_at,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_orders_emergency_highest() {
        assert!(UrgencyLevel::Emergency > UrgencyLevel::High);
        assert!(UrgencyLevel::High > UrgencyLevel::Normal);
        assert_eq!(UrgencyLevel::parse(" emergency "), Some(UrgencyLevel::Emergency));
        assert_eq!(UrgencyLevel::parse("critical"), None);
    }

    #[test]
    fn only_unable_to_capture_reopens_report() {
        assert!(CompletionOutcome::Success.resolves_report());
        assert!(CompletionOutcome::Referred.resolves_report());
        assert!(CompletionOutcome::AnimalGone.resolves_report());
        assert!(!CompletionOutcome::UnableToCapture.resolves_report());
    }

    #[test]
    fn statuses_serialize_as_screaming_snake_case() {
        let json = serde_json::to_string(&AssignmentStatus::InProgress).expect("serialize");
        assert_eq!(json, "\"IN_PROGRESS\"");
        let outcome: CompletionOutcome =
            serde_json::from_str("\"ANIMAL_GONE\"").expect("deserialize");
        assert_eq!(outcome, CompletionOutcome::AnimalGone);
    }

    #[test]
    fn haversine_distance_is_roughly_correct() {
        let des_moines = GeoPoint::new(41.5868, -93.6250);
        let ames = GeoPoint::new(42.0308, -93.6319);
        let distance = des_moines.distance_km(&ames);
        assert!((distance - 49.4).abs() < 1.0, "got {distance}");
        assert!(des_moines.distance_km(&des_moines) < 1e-9);
    }
}
