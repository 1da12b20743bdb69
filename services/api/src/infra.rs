use metrics_exporter_prometheus::PrometheusHandle;
use station_alloc::allocation::{
    AdmissionNotice, AllocationRecord, AllocationRepository, NoticeError, NoticePublisher,
    RepositoryError, RunId,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAllocationRepository {
    records: Arc<Mutex<HashMap<RunId, AllocationRecord>>>,
}

impl AllocationRepository for InMemoryAllocationRepository {
    fn insert(&self, record: AllocationRecord) -> Result<AllocationRecord, RepositoryError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        if guard.contains_key(&record.run_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.run_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, run_id: &RunId) -> Result<Option<AllocationRecord>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        Ok(guard.get(run_id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AllocationRecord>, RepositoryError> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))?;
        let mut records: Vec<AllocationRecord> = guard.values().cloned().collect();
        records.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then_with(|| b.run_id.0.cmp(&a.run_id.0))
        });
        records.truncate(limit);
        Ok(records)
    }
}

/// Keeps notices in memory and logs each one; stands in for a mailer.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNoticePublisher {
    events: Arc<Mutex<Vec<AdmissionNotice>>>,
}

impl NoticePublisher for InMemoryNoticePublisher {
    fn publish(&self, notice: AdmissionNotice) -> Result<(), NoticeError> {
        info!(
            run_id = %notice.run_id.0,
            applicant = %notice.applicant,
            location = %notice.location,
            "admission notice queued"
        );
        let mut guard = self
            .events
            .lock()
            .map_err(|_| NoticeError::Transport("notice mutex poisoned".to_string()))?;
        guard.push(notice);
        Ok(())
    }
}

impl InMemoryNoticePublisher {
    pub(crate) fn events(&self) -> Vec<AdmissionNotice> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}
