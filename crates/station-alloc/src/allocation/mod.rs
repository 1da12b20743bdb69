//! Capacitated many-to-one allocation of applicants to stations.
//!
//! Every round each pending applicant proposes to the station at the front of its
//! preference list. Stations adjudicate their whole batch of proposals at once: ineligible
//! proposers are filtered, the rest are ranked by score (ties broken by the lower id) and
//! admitted up to the remaining capacity. Everyone not admitted moves on to the next
//! preference, and applicants that run out of preferences are rejected. Admissions are
//! final; a station never bumps an applicant it already holds.

pub mod applicant;
pub mod domain;
pub mod eligibility;
pub mod engine;
pub mod position;
pub mod preference;
pub mod ranking;
pub mod report;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use applicant::{
    Applicant, ApplicantState, Decision, Outcome, Participant, RejectionCause, Transition,
};
pub use domain::{AllocationRequest, ApplicantId, ApplicantRecord, PositionRecord, PositionRef};
pub use eligibility::{is_eligible, Ineligibility};
pub use engine::{AllocationEngine, AllocationFault, FaultKind, RoundSummary};
pub use position::Position;
pub use preference::PreferenceList;
pub use report::{AllocationReport, ApplicantOutcomeView, OutcomeCounts, PositionFillView};
pub use repository::{
    AdmissionNotice, AllocationRecord, AllocationRepository, NoticeError, NoticePublisher,
    RepositoryError, RunId, RunStatusView,
};
pub use roster::{Roster, SetupError};
pub use router::allocation_router;
pub use service::{AllocationService, AllocationServiceError};
