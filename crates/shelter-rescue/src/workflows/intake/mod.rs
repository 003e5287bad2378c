//! CSV intake for incident reports and volunteer rosters, used to seed store adapters.

mod parser;

use crate::workflows::rescue::domain::{
    GeoPoint, IncidentReport, ReportId, ReportStatus, SkillTag, TrainingRequirement,
    UrgencyLevel, VolunteerId, VolunteerProfile,
};
use std::io::Read;
use std::path::Path;

use parser::{ReportRow, VolunteerRow};

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidUrgency { report_id: String, value: String },
    InvalidTimestamp { report_id: String, value: String },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read intake file: {}", err),
            ImportError::Csv(err) => write!(f, "invalid intake CSV data: {}", err),
            ImportError::InvalidUrgency { report_id, value } => write!(
                f,
                "report {} has unknown urgency '{}' (expected NORMAL, HIGH or EMERGENCY)",
                report_id, value
            ),
            ImportError::InvalidTimestamp { report_id, value } => write!(
                f,
                "report {} has unparseable created_at '{}'",
                report_id, value
            ),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidUrgency { .. } | ImportError::InvalidTimestamp { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Loads incident reports. Every imported report starts `OPEN`.
pub struct IncidentReportImporter;

impl IncidentReportImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<IncidentReport>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<IncidentReport>, ImportError> {
        parser::parse_rows::<_, ReportRow>(reader)?
            .into_iter()
            .map(report_from_row)
            .collect()
    }
}

fn report_from_row(row: ReportRow) -> Result<IncidentReport, ImportError> {
    let urgency =
        UrgencyLevel::parse(&row.urgency).ok_or_else(|| ImportError::InvalidUrgency {
            report_id: row.id.clone(),
            value: row.urgency.clone(),
        })?;
    let created_at =
        parser::parse_timestamp(&row.created_at).ok_or_else(|| ImportError::InvalidTimestamp {
            report_id: row.id.clone(),
            value: row.created_at.clone(),
        })?;

    let required = parser::split_tag_list(row.required.as_deref())
        .into_iter()
        .map(|(tag, label)| TrainingRequirement::required(tag, label));
    let recommended = parser::split_tag_list(row.recommended.as_deref())
        .into_iter()
        .map(|(tag, label)| TrainingRequirement::recommended(tag, label));

    Ok(IncidentReport {
        id: ReportId(row.id),
        animal_type: row.animal,
        condition: row.condition,
        urgency,
        location: GeoPoint::new(row.latitude, row.longitude),
        description: row.description,
        created_at,
        requirements: required.chain(recommended).collect(),
        status: ReportStatus::Open,
    })
}

/// Loads volunteer profiles exported by the volunteer-management subsystem.
pub struct VolunteerRosterImporter;

impl VolunteerRosterImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<VolunteerProfile>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<VolunteerProfile>, ImportError> {
        Ok(parser::parse_rows::<_, VolunteerRow>(reader)?
            .into_iter()
            .map(volunteer_from_row)
            .collect())
    }
}

fn volunteer_from_row(row: VolunteerRow) -> VolunteerProfile {
    let location = match (row.latitude, row.longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
        _ => None,
    };

    VolunteerProfile {
        display_name: if row.name.is_empty() {
            row.id.clone()
        } else {
            row.name
        },
        id: VolunteerId(row.id),
        completed_trainings: parser::split_tag_list(row.trainings.as_deref())
            .into_iter()
            .map(|(tag, _)| SkillTag(tag))
            .collect(),
        available: row.available,
        location,
    }
}
