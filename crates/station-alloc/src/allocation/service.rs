use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::AllocationRequest;
use super::engine::AllocationFault;
use super::repository::{
    AdmissionNotice, AllocationRecord, AllocationRepository, NoticeError, NoticePublisher,
    RepositoryError, RunId,
};
use super::roster::{Roster, SetupError};
use crate::config::AllocationConfig;

/// Service composing roster validation, the engine, run storage, and admission notices.
pub struct AllocationService<R, N> {
    repository: Arc<R>,
    notices: Arc<N>,
    config: AllocationConfig,
}

static RUN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_run_id() -> RunId {
    let id = RUN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RunId(format!("run-{id:06}"))
}

impl<R, N> AllocationService<R, N>
where
    R: AllocationRepository + 'static,
    N: NoticePublisher + 'static,
{
    pub fn new(repository: Arc<R>, notices: Arc<N>, config: AllocationConfig) -> Self {
        Self {
            repository,
            notices,
            config,
        }
    }

    /// Run an allocation to completion, store it, and notify every admitted applicant.
    pub fn run(
        &self,
        request: AllocationRequest,
    ) -> Result<AllocationRecord, AllocationServiceError> {
        let mut engine = Roster::from_request(request)?
            .with_parallel_threshold(self.config.parallel_threshold);
        let report = engine.run()?;

        let record = AllocationRecord {
            run_id: next_run_id(),
            completed_at: Utc::now(),
            report,
        };
        let stored = self.repository.insert(record)?;

        for (view, location) in stored.report.placements() {
            let fill = stored.report.position(location);
            self.notices.publish(AdmissionNotice {
                run_id: stored.run_id.clone(),
                applicant: view.id,
                name: view.name.clone(),
                location: location.to_string(),
                specialization: fill.and_then(|fill| fill.specialization.clone()),
                stipend: fill.map(|fill| fill.stipend).unwrap_or_default(),
            })?;
        }

        let counts = stored.report.summary();
        if counts.accepted == 0 {
            warn!(run_id = %stored.run_id.0, "allocation admitted nobody");
        }
        info!(
            run_id = %stored.run_id.0,
            rounds = stored.report.rounds,
            accepted = counts.accepted,
            rejected = counts.rejected,
            withdrawn = counts.withdrawn,
            "allocation run stored"
        );
        Ok(stored)
    }

    pub fn get(&self, run_id: &RunId) -> Result<AllocationRecord, AllocationServiceError> {
        let record = self
            .repository
            .fetch(run_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<AllocationRecord>, AllocationServiceError> {
        Ok(self.repository.recent(limit)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AllocationServiceError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Fault(#[from] AllocationFault),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Notice(#[from] NoticeError),
}
