use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use serde_json::Value;

use crate::allocation::domain::{AllocationRequest, ApplicantId, ApplicantRecord, PositionRecord};
use crate::allocation::repository::{
    AdmissionNotice, AllocationRecord, AllocationRepository, NoticeError, NoticePublisher,
    RepositoryError, RunId,
};
use crate::allocation::{allocation_router, AllocationService};
use crate::config::AllocationConfig;

pub(super) fn station(location: &str, capacity: u32, cutoff: f32) -> PositionRecord {
    PositionRecord {
        location: location.to_string(),
        stipend: 18_000,
        categories: vec!["EE".to_string(), "ECE".to_string()],
        required_attributes: Vec::new(),
        cutoff,
        capacity,
        specialization: None,
    }
}

pub(super) fn student(id: u32, score: f32, preferences: &[&str]) -> ApplicantRecord {
    ApplicantRecord {
        id,
        name: format!("Student {id}"),
        score,
        category: "EE".to_string(),
        attributes: vec!["lab-safety".to_string()],
        preferences: preferences.iter().map(|value| value.to_string()).collect(),
    }
}

/// Two stations, one of them a specialized electronics lab, and four students.
pub(super) fn request() -> AllocationRequest {
    let mut lab = station("Bengaluru", 1, 8.0);
    lab.required_attributes = vec!["lab-safety".to_string()];
    lab.specialization = Some("VLSI".to_string());
    lab.stipend = 30_000;

    AllocationRequest {
        positions: vec![lab, station("Hyderabad", 2, 7.0)],
        applicants: vec![
            student(1, 9.0, &["Bengaluru", "Hyderabad"]),
            student(2, 9.5, &["Bengaluru"]),
            student(3, 6.0, &["Hyderabad"]),
            student(4, 7.5, &["Hyderabad", "Bengaluru"]),
        ],
        withdrawals: Vec::new(),
    }
}

pub(super) fn invalid_request() -> AllocationRequest {
    let mut request = request();
    let first = &mut request.applicants[0];
    first.preferences.push("Atlantis".to_string());
    request
}

pub(super) fn build_service() -> (
    AllocationService<MemoryRepository, MemoryNotices>,
    Arc<MemoryRepository>,
    Arc<MemoryNotices>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notices = Arc::new(MemoryNotices::default());
    let service = AllocationService::new(
        repository.clone(),
        notices.clone(),
        AllocationConfig::default(),
    );
    (service, repository, notices)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<RunId, AllocationRecord>>>,
}

impl AllocationRepository for MemoryRepository {
    fn insert(&self, record: AllocationRecord) -> Result<AllocationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.run_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.run_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, run_id: &RunId) -> Result<Option<AllocationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(run_id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<AllocationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<_> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.run_id.0.cmp(&a.run_id.0));
        records.truncate(limit);
        Ok(records)
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotices {
    events: Arc<Mutex<Vec<AdmissionNotice>>>,
}

impl MemoryNotices {
    pub(super) fn events(&self) -> Vec<AdmissionNotice> {
        self.events.lock().expect("notice mutex poisoned").clone()
    }

    pub(super) fn applicants(&self) -> Vec<ApplicantId> {
        let mut ids: Vec<_> = self
            .events()
            .iter()
            .map(|notice| notice.applicant)
            .collect();
        ids.sort();
        ids
    }
}

impl NoticePublisher for MemoryNotices {
    fn publish(&self, notice: AdmissionNotice) -> Result<(), NoticeError> {
        self.events
            .lock()
            .expect("notice mutex poisoned")
            .push(notice);
        Ok(())
    }
}

pub(super) struct OfflineNotices;

impl NoticePublisher for OfflineNotices {
    fn publish(&self, _notice: AdmissionNotice) -> Result<(), NoticeError> {
        Err(NoticeError::Transport("smtp relay down".to_string()))
    }
}

pub(super) struct ConflictRepository;

impl AllocationRepository for ConflictRepository {
    fn insert(&self, _record: AllocationRecord) -> Result<AllocationRecord, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn fetch(&self, _run_id: &RunId) -> Result<Option<AllocationRecord>, RepositoryError> {
        Ok(None)
    }

    fn recent(&self, _limit: usize) -> Result<Vec<AllocationRecord>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableRepository;

impl AllocationRepository for UnavailableRepository {
    fn insert(&self, _record: AllocationRecord) -> Result<AllocationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _run_id: &RunId) -> Result<Option<AllocationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<AllocationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn assert_conflict_response(response: Response) {
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn allocation_router_with_service(
    service: AllocationService<MemoryRepository, MemoryNotices>,
) -> axum::Router {
    allocation_router(Arc::new(service))
}
