use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::ApplicantId;
use super::report::{AllocationReport, OutcomeCounts};

/// Identifier assigned to each completed allocation run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

/// Stored result of a completed allocation run.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationRecord {
    pub run_id: RunId,
    pub completed_at: DateTime<Utc>,
    pub report: AllocationReport,
}

impl AllocationRecord {
    pub fn status_view(&self) -> RunStatusView {
        RunStatusView {
            run_id: self.run_id.clone(),
            completed_at: self.completed_at,
            rounds: self.report.rounds,
            outcomes: self.report.summary(),
        }
    }
}

/// Condensed view of a run for listings.
#[derive(Debug, Clone, Serialize)]
pub struct RunStatusView {
    pub run_id: RunId,
    pub completed_at: DateTime<Utc>,
    pub rounds: u32,
    pub outcomes: OutcomeCounts,
}

/// Storage abstraction for completed runs.
pub trait AllocationRepository: Send + Sync {
    fn insert(&self, record: AllocationRecord) -> Result<AllocationRecord, RepositoryError>;
    fn fetch(&self, run_id: &RunId) -> Result<Option<AllocationRecord>, RepositoryError>;
    fn recent(&self, limit: usize) -> Result<Vec<AllocationRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook informing downstream systems of admissions (mailers, portals).
pub trait NoticePublisher: Send + Sync {
    fn publish(&self, notice: AdmissionNotice) -> Result<(), NoticeError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionNotice {
    pub run_id: RunId,
    pub applicant: ApplicantId,
    pub name: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    pub stipend: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum NoticeError {
    #[error("notice transport unavailable: {0}")]
    Transport(String),
}
