use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::super::domain::{ReportId, VolunteerId};
use super::QualificationResult;

#[derive(Clone)]
struct CachedQualification {
    result: QualificationResult,
    computed_at: Instant,
}

/// Short-lived read-path cache keyed by (report, volunteer).
///
/// Claims never consult this cache; a stale "qualified" entry must not admit a claim.
pub struct QualificationCache {
    ttl: Duration,
    entries: Mutex<HashMap<(ReportId, VolunteerId), CachedQualification>>,
}

impl QualificationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Looks at the one entry only; an expired entry is dropped on the way out.
    pub fn get(&self, report: &ReportId, volunteer: &VolunteerId) -> Option<QualificationResult> {
        let key = (report.clone(), volunteer.clone());
        let mut entries = self.entries();
        let entry = entries.get(&key)?;
        if entry.computed_at.elapsed() < self.ttl {
            return Some(entry.result.clone());
        }
        entries.remove(&key);
        None
    }

    /// Drop every expired entry, returning how many went.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.computed_at.elapsed() < ttl);
        before - entries.len()
    }

    pub fn insert(&self, report: ReportId, volunteer: VolunteerId, result: QualificationResult) {
        self.entries().insert(
            (report, volunteer),
            CachedQualification {
                result,
                computed_at: Instant::now(),
            },
        );
    }

    /// Drop every entry for the volunteer, returning how many were removed.
    pub fn invalidate_volunteer(&self, volunteer: &VolunteerId) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|(_, cached_volunteer), _| cached_volunteer != volunteer);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries are independent values, so a panic mid-insert leaves nothing to repair.
    fn entries(&self) -> MutexGuard<'_, HashMap<(ReportId, VolunteerId), CachedQualification>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
