use serde::Serialize;

use super::applicant::{ApplicantState, Outcome, Participant, RejectionCause};
use super::domain::{ApplicantId, PositionRef};
use super::engine::RoundSummary;
use super::position::Position;

/// Final (or, inside a fault, current) outcome of one applicant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicantOutcomeView {
    pub id: ApplicantId,
    pub name: String,
    pub score: f32,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<RejectionCause>,
}

/// Occupancy of one station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionFillView {
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    pub stipend: u32,
    pub capacity: usize,
    pub held: usize,
    pub admitted: Vec<ApplicantId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub accepted: usize,
    pub rejected: usize,
    pub withdrawn: usize,
    pub pending: usize,
}

/// Snapshot of an allocation, applicants ordered by id and stations in table order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationReport {
    pub rounds: u32,
    pub history: Vec<RoundSummary>,
    pub applicants: Vec<ApplicantOutcomeView>,
    pub positions: Vec<PositionFillView>,
}

impl AllocationReport {
    pub(crate) fn capture<P: Participant>(
        rounds: u32,
        history: &[RoundSummary],
        participants: &[P],
        positions: &[Position],
    ) -> Self {
        let location_of = |position: PositionRef| {
            positions
                .get(position.index())
                .map(|found| found.location().to_string())
        };

        let mut applicants: Vec<ApplicantOutcomeView> = participants
            .iter()
            .map(|participant| {
                let state = participant.state();
                ApplicantOutcomeView {
                    id: participant.id(),
                    name: participant.name().to_string(),
                    score: participant.score(),
                    outcome: state.outcome(),
                    position: state.position().and_then(location_of),
                    rejection: match state {
                        ApplicantState::Rejected { cause } => Some(cause),
                        _ => None,
                    },
                }
            })
            .collect();
        applicants.sort_by_key(|view| view.id);

        let positions = positions
            .iter()
            .map(|position| PositionFillView {
                location: position.location().to_string(),
                specialization: position.specialization().map(str::to_string),
                stipend: position.stipend(),
                capacity: position.capacity(),
                held: position.held(),
                admitted: position.admitted().to_vec(),
            })
            .collect();

        Self {
            rounds,
            history: history.to_vec(),
            applicants,
            positions,
        }
    }

    pub fn summary(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for view in &self.applicants {
            match view.outcome {
                Outcome::Accepted => counts.accepted += 1,
                Outcome::Rejected => counts.rejected += 1,
                Outcome::Withdrawn => counts.withdrawn += 1,
                Outcome::Pending => counts.pending += 1,
            }
        }
        counts
    }

    pub fn applicant(&self, id: ApplicantId) -> Option<&ApplicantOutcomeView> {
        self.applicants
            .binary_search_by_key(&id, |view| view.id)
            .ok()
            .map(|index| &self.applicants[index])
    }

    pub fn position(&self, location: &str) -> Option<&PositionFillView> {
        self.positions.iter().find(|view| view.location == location)
    }

    /// Accepted applicants paired with their admitting location.
    pub fn placements(&self) -> impl Iterator<Item = (&ApplicantOutcomeView, &str)> + '_ {
        self.applicants
            .iter()
            .filter_map(|view| view.position.as_deref().map(|location| (view, location)))
    }
}
