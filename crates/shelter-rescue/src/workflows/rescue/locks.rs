use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::domain::ReportId;

/// Arena of per-report mutexes serializing claims and transitions.
///
/// Guards protect `()`, so a poisoned lock carries no broken invariant and is recovered.
#[derive(Default)]
pub(crate) struct ReportLocks {
    table: Mutex<HashMap<ReportId, Arc<Mutex<()>>>>,
}

impl ReportLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `critical` while holding the report's lock. The guard drops on every exit path.
    pub(crate) fn with_lock<T>(&self, report_id: &ReportId, critical: impl FnOnce() -> T) -> T {
        let lock = self.handle(report_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        critical()
    }

    /// Drop the report's entry once nobody else holds a handle to it.
    pub(crate) fn reclaim(&self, report_id: &ReportId) -> bool {
        let mut table = self.table();
        match table.get(report_id) {
            Some(lock) if Arc::strong_count(lock) == 1 => {
                table.remove(report_id);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.table().len()
    }

    fn handle(&self, report_id: &ReportId) -> Arc<Mutex<()>> {
        let mut table = self.table();
        Arc::clone(
            table
                .entry(report_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn table(&self) -> MutexGuard<'_, HashMap<ReportId, Arc<Mutex<()>>>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn serializes_critical_sections_per_report() {
        let locks = Arc::new(ReportLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));
        let report = ReportId("rpt-lock".to_string());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                let barrier = Arc::clone(&barrier);
                let report = report.clone();
                thread::spawn(move || {
                    barrier.wait();
                    locks.with_lock(&report, || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::yield_now();
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("worker finished");
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reclaim_removes_idle_entries_only() {
        let locks = ReportLocks::new();
        let report = ReportId("rpt-reclaim".to_string());

        locks.with_lock(&report, || {
            assert!(!locks.reclaim(&report), "held lock must survive reclaim");
        });
        assert_eq!(locks.len(), 1);
        assert!(locks.reclaim(&report));
        assert_eq!(locks.len(), 0);
        assert!(!locks.reclaim(&report));
    }

    #[test]
    fn lock_is_released_after_panic() {
        let locks = Arc::new(ReportLocks::new());
        let report = ReportId("rpt-panic".to_string());

        let worker_locks = Arc::clone(&locks);
        let worker_report = report.clone();
        let result = thread::spawn(move || {
            worker_locks.with_lock(&worker_report, || panic!("boom"));
        })
        .join();
        assert!(result.is_err());

        let value = locks.with_lock(&report, || 7);
        assert_eq!(value, 7);
    }
}
