use metrics_exporter_prometheus::PrometheusHandle;
use shelter_rescue::workflows::intake::{
    ImportError, IncidentReportImporter, VolunteerRosterImporter,
};
use shelter_rescue::workflows::rescue::{
    AssignmentId, AssignmentRepository, AssignmentRole, CompletionNotice, CompletionNotifier,
    IncidentReport, NotifyError, RepositoryError, RescueAssignment, RescueStores, ReportId,
    ReportStatus, ReportStore, VolunteerId, VolunteerProfile, VolunteerStore,
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

const DEMO_REPORTS: &[u8] =
    include_bytes!("../../../crates/shelter-rescue/data/sample_reports.csv");
const DEMO_VOLUNTEERS: &[u8] =
    include_bytes!("../../../crates/shelter-rescue/data/sample_volunteers.csv");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryReportStore {
    records: Arc<Mutex<HashMap<ReportId, IncidentReport>>>,
}

impl InMemoryReportStore {
    pub(crate) fn seeded(reports: Vec<IncidentReport>) -> Self {
        let records = reports
            .into_iter()
            .map(|report| (report.id.clone(), report))
            .collect();
        Self {
            records: Arc::new(Mutex::new(records)),
        }
    }
}

impl ReportStore for InMemoryReportStore {
    fn open_reports(&self) -> Result<Vec<IncidentReport>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .values()
            .filter(|report| report.status == ReportStatus::Open)
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<IncidentReport>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard.get(id).cloned())
    }

    fn set_status(&self, id: &ReportId, status: ReportStatus) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        let report = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        report.status = status;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryVolunteerStore {
    profiles: Arc<Mutex<HashMap<VolunteerId, VolunteerProfile>>>,
}

impl InMemoryVolunteerStore {
    pub(crate) fn seeded(volunteers: Vec<VolunteerProfile>) -> Self {
        let profiles = volunteers
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect();
        Self {
            profiles: Arc::new(Mutex::new(profiles)),
        }
    }
}

impl VolunteerStore for InMemoryVolunteerStore {
    fn profile(&self, id: &VolunteerId) -> Result<Option<VolunteerProfile>, RepositoryError> {
        let guard = lock(&self.profiles)?;
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAssignmentRepository {
    records: Arc<Mutex<HashMap<AssignmentId, RescueAssignment>>>,
}

impl AssignmentRepository for InMemoryAssignmentRepository {
    fn insert(&self, assignment: RescueAssignment) -> Result<RescueAssignment, RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&assignment.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(assignment.id.clone(), assignment.clone());
        Ok(assignment)
    }

    fn update(&self, assignment: RescueAssignment) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
        if guard.contains_key(&assignment.id) {
            guard.insert(assignment.id.clone(), assignment);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &AssignmentId) -> Result<Option<RescueAssignment>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard.get(id).cloned())
    }

    fn active_for_report(
        &self,
        report_id: &ReportId,
    ) -> Result<Option<RescueAssignment>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .values()
            .find(|assignment| &assignment.report_id == report_id && assignment.is_active())
            .cloned())
    }

    fn for_report(&self, report_id: &ReportId) -> Result<Vec<RescueAssignment>, RepositoryError> {
        let guard = lock(&self.records)?;
        let mut history: Vec<_> = guard
            .values()
            .filter(|assignment| &assignment.report_id == report_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| {
            a.assigned_at
                .cmp(&b.assigned_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(history)
    }

    fn for_volunteer(
        &self,
        volunteer_id: &VolunteerId,
    ) -> Result<Vec<RescueAssignment>, RepositoryError> {
        let guard = lock(&self.records)?;
        Ok(guard
            .values()
            .filter(|assignment| &assignment.volunteer_id == volunteer_id)
            .cloned()
            .collect())
    }
}

/// Stands in for the points service: records each notice and logs it.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCompletionNotifier {
    notices: Arc<Mutex<Vec<CompletionNotice>>>,
}

impl CompletionNotifier for InMemoryCompletionNotifier {
    fn assignment_completed(&self, notice: CompletionNotice) -> Result<(), NotifyError> {
        let mut guard = self
            .notices
            .lock()
            .map_err(|_| NotifyError::Transport("notice buffer lock poisoned".to_string()))?;
        info!(
            assignment_id = %notice.assignment_id,
            volunteer_id = %notice.volunteer_id,
            outcome = notice.outcome.label(),
            "completion notice recorded"
        );
        guard.push(notice);
        Ok(())
    }
}

impl InMemoryCompletionNotifier {
    pub(crate) fn notices(&self) -> Vec<CompletionNotice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub(crate) struct Dataset {
    pub(crate) reports: Vec<IncidentReport>,
    pub(crate) volunteers: Vec<VolunteerProfile>,
}

/// Load reports and roster from CSV exports, falling back to the bundled sample data for
/// whichever file is not given.
pub(crate) fn load_dataset(
    reports_csv: Option<&Path>,
    volunteers_csv: Option<&Path>,
) -> Result<Dataset, ImportError> {
    let reports = match reports_csv {
        Some(path) => IncidentReportImporter::from_path(path)?,
        None => IncidentReportImporter::from_reader(DEMO_REPORTS)?,
    };
    let volunteers = match volunteers_csv {
        Some(path) => VolunteerRosterImporter::from_path(path)?,
        None => VolunteerRosterImporter::from_reader(DEMO_VOLUNTEERS)?,
    };
    Ok(Dataset {
        reports,
        volunteers,
    })
}

pub(crate) fn in_memory_stores(dataset: Dataset) -> (RescueStores, InMemoryCompletionNotifier) {
    let notifier = InMemoryCompletionNotifier::default();
    let stores = RescueStores {
        reports: Arc::new(InMemoryReportStore::seeded(dataset.reports)),
        volunteers: Arc::new(InMemoryVolunteerStore::seeded(dataset.volunteers)),
        assignments: Arc::new(InMemoryAssignmentRepository::default()),
        notifier: Arc::new(notifier.clone()),
    };
    (stores, notifier)
}

pub(crate) fn parse_role(raw: &str) -> Result<AssignmentRole, String> {
    AssignmentRole::parse(raw).ok_or_else(|| {
        format!("unknown role '{raw}' (expected PRIMARY, BACKUP, TRANSPORT or MEDICAL)")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelter_rescue::workflows::rescue::AssignmentStatus;

    #[test]
    fn bundled_dataset_loads() {
        let dataset = load_dataset(None, None).expect("bundled csv parses");
        assert_eq!(dataset.reports.len(), 5);
        assert_eq!(dataset.volunteers.len(), 4);
    }

    #[test]
    fn missing_csv_path_is_an_io_error() {
        let outcome = load_dataset(Some(Path::new("./no-such-reports.csv")), None);
        assert!(matches!(outcome, Err(ImportError::Io(_))));
    }

    #[test]
    fn history_is_oldest_first() {
        let repository = InMemoryAssignmentRepository::default();
        let report_id = ReportId("rpt-1".to_string());
        let older = chrono::Utc::now() - chrono::Duration::hours(2);
        for (id, assigned_at) in [("asg-b", chrono::Utc::now()), ("asg-a", older)] {
            repository
                .insert(RescueAssignment {
                    id: AssignmentId(id.to_string()),
                    report_id: report_id.clone(),
                    volunteer_id: VolunteerId("vol-1".to_string()),
                    role: AssignmentRole::Primary,
                    status: AssignmentStatus::Cancelled,
                    volunteer_notes: String::new(),
                    outcome: None,
                    completion_notes: Some("reassigned".to_string()),
                    assigned_at,
                    started_at: None,
                    completed_at: None,
                    cancelled_at: Some(assigned_at),
                })
                .expect("insert");
        }

        let history = repository.for_report(&report_id).expect("history");
        assert_eq!(history[0].id.0, "asg-a");
        assert_eq!(history[1].id.0, "asg-b");
    }

    #[test]
    fn role_parser_explains_failures() {
        assert_eq!(parse_role("backup"), Ok(AssignmentRole::Backup));
        assert!(parse_role("driver").unwrap_err().contains("driver"));
    }
}
