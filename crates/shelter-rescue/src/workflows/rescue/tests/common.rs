use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::config::DispatchConfig;
use crate::workflows::rescue::domain::{
    AssignmentId, GeoPoint, IncidentReport, RescueAssignment, ReportId, ReportStatus, SkillTag,
    TrainingRequirement, UrgencyLevel, VolunteerId, VolunteerProfile,
};
use crate::workflows::rescue::lifecycle::{AssignmentLifecycleManager, RescueStores};
use crate::workflows::rescue::repository::{
    AssignmentRepository, CompletionNotice, CompletionNotifier, NotifyError, ReportStore,
    RepositoryError, VolunteerStore,
};
use crate::workflows::rescue::service::DispatchCoordinator;

pub(super) fn report(
    id: &str,
    urgency: UrgencyLevel,
    hours_old: i64,
    requirements: Vec<TrainingRequirement>,
) -> IncidentReport {
    IncidentReport {
        id: ReportId(id.to_string()),
        animal_type: "Dog".to_string(),
        condition: "Injured".to_string(),
        urgency,
        location: GeoPoint::new(41.5868, -93.6250),
        description: format!("report {id}"),
        created_at: Utc::now() - Duration::hours(hours_old),
        requirements,
        status: ReportStatus::Open,
    }
}

pub(super) fn volunteer(id: &str, trainings: &[&str]) -> VolunteerProfile {
    VolunteerProfile {
        id: VolunteerId(id.to_string()),
        display_name: format!("Volunteer {id}"),
        completed_trainings: trainings.iter().map(|tag| SkillTag::new(*tag)).collect(),
        available: true,
        location: None,
    }
}

pub(super) fn basic_handling() -> TrainingRequirement {
    TrainingRequirement::required("basic-handling", "Basic animal handling")
}

pub(super) fn large_animal_required() -> TrainingRequirement {
    TrainingRequirement::required("large-animal", "Large animal handling")
}

pub(super) fn large_animal_recommended() -> TrainingRequirement {
    TrainingRequirement::recommended("large-animal", "Large animal handling")
}

/// Report R from the reference scenario: requires basic-handling, recommends large-animal.
pub(super) fn scenario_report(id: &str, urgency: UrgencyLevel) -> IncidentReport {
    report(
        id,
        urgency,
        2,
        vec![basic_handling(), large_animal_recommended()],
    )
}

pub(super) fn vid(id: &str) -> VolunteerId {
    VolunteerId(id.to_string())
}

pub(super) fn rid(id: &str) -> ReportId {
    ReportId(id.to_string())
}

#[derive(Default)]
pub(super) struct MemoryReportStore {
    records: Mutex<BTreeMap<ReportId, IncidentReport>>,
}

impl MemoryReportStore {
    pub(super) fn with(reports: Vec<IncidentReport>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.records.lock().expect("report mutex poisoned");
            for report in reports {
                guard.insert(report.id.clone(), report);
            }
        }
        store
    }

    pub(super) fn status(&self, id: &ReportId) -> Option<ReportStatus> {
        self.records
            .lock()
            .expect("report mutex poisoned")
            .get(id)
            .map(|report| report.status)
    }
}

impl ReportStore for MemoryReportStore {
    fn open_reports(&self) -> Result<Vec<IncidentReport>, RepositoryError> {
        let guard = self.records.lock().expect("report mutex poisoned");
        Ok(guard
            .values()
            .filter(|report| report.status == ReportStatus::Open)
            .cloned()
            .collect())
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<IncidentReport>, RepositoryError> {
        let guard = self.records.lock().expect("report mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn set_status(&self, id: &ReportId, status: ReportStatus) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("report mutex poisoned");
        let report = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        report.status = status;
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryVolunteerStore {
    profiles: Mutex<BTreeMap<VolunteerId, VolunteerProfile>>,
}

impl MemoryVolunteerStore {
    pub(super) fn with(volunteers: Vec<VolunteerProfile>) -> Self {
        let store = Self::default();
        for profile in volunteers {
            store.upsert(profile);
        }
        store
    }

    pub(super) fn upsert(&self, profile: VolunteerProfile) {
        self.profiles
            .lock()
            .expect("volunteer mutex poisoned")
            .insert(profile.id.clone(), profile);
    }

    pub(super) fn set_trainings(&self, id: &VolunteerId, trainings: &[&str]) {
        let mut guard = self.profiles.lock().expect("volunteer mutex poisoned");
        if let Some(profile) = guard.get_mut(id) {
            profile.completed_trainings = trainings
                .iter()
                .map(|tag| SkillTag::new(*tag))
                .collect::<BTreeSet<_>>();
        }
    }
}

impl VolunteerStore for MemoryVolunteerStore {
    fn profile(&self, id: &VolunteerId) -> Result<Option<VolunteerProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("volunteer mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryAssignments {
    records: Mutex<Vec<RescueAssignment>>,
}

impl MemoryAssignments {
    pub(super) fn all(&self) -> Vec<RescueAssignment> {
        self.records.lock().expect("assignment mutex poisoned").clone()
    }
}

impl AssignmentRepository for MemoryAssignments {
    fn insert(&self, assignment: RescueAssignment) -> Result<RescueAssignment, RepositoryError> {
        let mut guard = self.records.lock().expect("assignment mutex poisoned");
        if guard.iter().any(|existing| existing.id == assignment.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(assignment.clone());
        Ok(assignment)
    }

    fn update(&self, assignment: RescueAssignment) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("assignment mutex poisoned");
        let slot = guard
            .iter_mut()
            .find(|existing| existing.id == assignment.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = assignment;
        Ok(())
    }

    fn fetch(&self, id: &AssignmentId) -> Result<Option<RescueAssignment>, RepositoryError> {
        let guard = self.records.lock().expect("assignment mutex poisoned");
        Ok(guard.iter().find(|existing| &existing.id == id).cloned())
    }

    fn active_for_report(
        &self,
        report_id: &ReportId,
    ) -> Result<Option<RescueAssignment>, RepositoryError> {
        let guard = self.records.lock().expect("assignment mutex poisoned");
        Ok(guard
            .iter()
            .find(|existing| &existing.report_id == report_id && existing.is_active())
            .cloned())
    }

    fn for_report(&self, report_id: &ReportId) -> Result<Vec<RescueAssignment>, RepositoryError> {
        let guard = self.records.lock().expect("assignment mutex poisoned");
        Ok(guard
            .iter()
            .filter(|existing| &existing.report_id == report_id)
            .cloned()
            .collect())
    }

    fn for_volunteer(
        &self,
        volunteer_id: &VolunteerId,
    ) -> Result<Vec<RescueAssignment>, RepositoryError> {
        let guard = self.records.lock().expect("assignment mutex poisoned");
        Ok(guard
            .iter()
            .filter(|existing| &existing.volunteer_id == volunteer_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    notices: Mutex<Vec<CompletionNotice>>,
}

impl RecordingNotifier {
    pub(super) fn notices(&self) -> Vec<CompletionNotice> {
        self.notices.lock().expect("notifier mutex poisoned").clone()
    }
}

impl CompletionNotifier for RecordingNotifier {
    fn assignment_completed(&self, notice: CompletionNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notifier mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct OfflineNotifier;

impl CompletionNotifier for OfflineNotifier {
    fn assignment_completed(&self, _notice: CompletionNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("points service offline".to_string()))
    }
}

pub(super) struct UnavailableReports;

impl ReportStore for UnavailableReports {
    fn open_reports(&self) -> Result<Vec<IncidentReport>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ReportId) -> Result<Option<IncidentReport>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn set_status(&self, _id: &ReportId, _status: ReportStatus) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Reads succeed; every status write fails.
pub(super) struct FrozenReports(pub(super) Arc<MemoryReportStore>);

impl ReportStore for FrozenReports {
    fn open_reports(&self) -> Result<Vec<IncidentReport>, RepositoryError> {
        self.0.open_reports()
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<IncidentReport>, RepositoryError> {
        self.0.fetch(id)
    }

    fn set_status(&self, _id: &ReportId, _status: ReportStatus) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("report table is read-only".to_string()))
    }
}

/// Assignment store whose writes can be switched off mid-test.
#[derive(Default)]
pub(super) struct FlakyAssignments {
    pub(super) inner: MemoryAssignments,
    reject_writes: AtomicBool,
}

impl FlakyAssignments {
    pub(super) fn reject_writes(&self) {
        self.reject_writes.store(true, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("assignment writes disabled".to_string()));
        }
        Ok(())
    }
}

impl AssignmentRepository for FlakyAssignments {
    fn insert(&self, assignment: RescueAssignment) -> Result<RescueAssignment, RepositoryError> {
        self.check_writable()?;
        self.inner.insert(assignment)
    }

    fn update(&self, assignment: RescueAssignment) -> Result<(), RepositoryError> {
        self.check_writable()?;
        self.inner.update(assignment)
    }

    fn fetch(&self, id: &AssignmentId) -> Result<Option<RescueAssignment>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn active_for_report(
        &self,
        report_id: &ReportId,
    ) -> Result<Option<RescueAssignment>, RepositoryError> {
        self.inner.active_for_report(report_id)
    }

    fn for_report(&self, report_id: &ReportId) -> Result<Vec<RescueAssignment>, RepositoryError> {
        self.inner.for_report(report_id)
    }

    fn for_volunteer(
        &self,
        volunteer_id: &VolunteerId,
    ) -> Result<Vec<RescueAssignment>, RepositoryError> {
        self.inner.for_volunteer(volunteer_id)
    }
}

/// Coordinator wired to in-memory stores, with handles kept for assertions.
pub(super) struct Fixture {
    pub(super) coordinator: DispatchCoordinator,
    pub(super) reports: Arc<MemoryReportStore>,
    pub(super) volunteers: Arc<MemoryVolunteerStore>,
    pub(super) assignments: Arc<MemoryAssignments>,
    pub(super) notifier: Arc<RecordingNotifier>,
}

impl Fixture {
    pub(super) fn stores(&self) -> RescueStores {
        RescueStores {
            reports: self.reports.clone(),
            volunteers: self.volunteers.clone(),
            assignments: self.assignments.clone(),
            notifier: self.notifier.clone(),
        }
    }

    pub(super) fn lifecycle(&self) -> AssignmentLifecycleManager {
        AssignmentLifecycleManager::new(self.stores())
    }
}

pub(super) fn fixture(reports: Vec<IncidentReport>, volunteers: Vec<VolunteerProfile>) -> Fixture {
    let reports = Arc::new(MemoryReportStore::with(reports));
    let volunteers = Arc::new(MemoryVolunteerStore::with(volunteers));
    let assignments = Arc::new(MemoryAssignments::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let stores = RescueStores {
        reports: reports.clone(),
        volunteers: volunteers.clone(),
        assignments: assignments.clone(),
        notifier: notifier.clone(),
    };
    let coordinator = DispatchCoordinator::new(stores, &DispatchConfig::default());

    Fixture {
        coordinator,
        reports,
        volunteers,
        assignments,
        notifier,
    }
}

pub(super) fn scenario_fixture() -> Fixture {
    fixture(
        vec![scenario_report("rpt-r", UrgencyLevel::High)],
        vec![
            volunteer("vol-v", &["basic-handling"]),
            volunteer("vol-w", &[]),
        ],
    )
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
