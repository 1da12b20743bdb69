use std::collections::HashSet;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info};

use super::applicant::{Applicant, Participant, Transition};
use super::domain::{ApplicantId, PositionRef};
use super::eligibility;
use super::position::{AdmissionError, Position};
use super::ranking;
use super::report::AllocationReport;
use super::roster::SetupError;

/// Number of stations with proposals in a round at which adjudication fans out to rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// Counters for one completed round.
///
/// Applicants whose list is already empty when a round starts are counted in that round's
/// `exhausted`. If no round follows (nobody has anything left to propose), those rejections
/// belong to no summary and only show up in the applicant outcomes of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub round: u32,
    pub proposals: usize,
    pub admitted: usize,
    /// Eligible proposers that lost the capacity cut.
    pub outranked: usize,
    pub ineligible: usize,
    /// Applicants rejected because their preference list ran out.
    pub exhausted: usize,
}

/// Broken engine invariant. Never expected; the run is aborted with a state dump.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FaultKind {
    #[error("position {location} is full (capacity {capacity}) and cannot admit {applicant}")]
    CapacityExceeded {
        location: String,
        capacity: usize,
        applicant: ApplicantId,
    },
    #[error("applicant {applicant} is already {state} and cannot be admitted")]
    FinalizedMutation {
        applicant: ApplicantId,
        state: &'static str,
    },
    #[error("applicant {applicant} is already admitted at {location}")]
    DuplicateAdmission {
        applicant: ApplicantId,
        location: String,
    },
}

#[derive(Debug, thiserror::Error)]
#[error("internal consistency fault in round {round}: {kind}")]
pub struct AllocationFault {
    pub round: u32,
    pub kind: FaultKind,
    pub dump: Box<AllocationReport>,
}

#[derive(Debug, Default)]
struct BatchVerdict {
    admitted: Vec<usize>,
    outranked: Vec<usize>,
    ineligible: Vec<usize>,
}

/// Round-based deferred-acceptance engine.
///
/// Owns every participant and station for the duration of a run. Preference cursors and
/// outcomes only change inside [`AllocationEngine::step`] or through the explicit
/// [`withdraw`](AllocationEngine::withdraw) and [`reject`](AllocationEngine::reject) calls.
#[derive(Debug)]
pub struct AllocationEngine<P = Applicant> {
    participants: Vec<P>,
    positions: Vec<Position>,
    round: u32,
    history: Vec<RoundSummary>,
    parallel_threshold: usize,
    settled: bool,
}

impl<P> AllocationEngine<P>
where
    P: Participant + Sync,
{
    /// Rejects zero capacities, non-finite cutoffs or scores, duplicate ids and preferences
    /// pointing outside `positions`.
    pub fn new(participants: Vec<P>, positions: Vec<Position>) -> Result<Self, SetupError> {
        for position in &positions {
            if position.capacity() == 0 {
                return Err(SetupError::ZeroCapacity(position.location().to_string()));
            }
            if !position.cutoff().is_finite() {
                return Err(SetupError::NonFiniteCutoff(position.location().to_string()));
            }
        }

        let mut seen = HashSet::with_capacity(participants.len());
        for participant in &participants {
            if !seen.insert(participant.id()) {
                return Err(SetupError::DuplicateApplicant(participant.id()));
            }
            if !participant.score().is_finite() {
                return Err(SetupError::NonFiniteScore(participant.id()));
            }
            if let Some(target) = participant
                .preferences()
                .iter()
                .find(|target| target.index() >= positions.len())
            {
                return Err(SetupError::PositionOutOfRange {
                    applicant: participant.id(),
                    position: target.index(),
                });
            }
        }

        Ok(Self {
            participants,
            positions,
            round: 0,
            history: Vec::new(),
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
            settled: false,
        })
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold.max(1);
        self
    }

    /// Rounds completed so far.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn history(&self) -> &[RoundSummary] {
        &self.history
    }

    /// True once the fixed point has been reached.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn participants(&self) -> &[P] {
        &self.participants
    }

    pub fn participant(&self, id: ApplicantId) -> Option<&P> {
        self.participants
            .iter()
            .find(|participant| participant.id() == id)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, position: PositionRef) -> Option<&Position> {
        self.positions.get(position.index())
    }

    pub fn position_by_location(&self, location: &str) -> Option<(PositionRef, &Position)> {
        self.positions
            .iter()
            .enumerate()
            .find(|(_, position)| position.location() == location)
            .map(|(index, position)| (PositionRef(index), position))
    }

    /// Applicant opts out. Already finalized applicants are left untouched.
    pub fn withdraw(&mut self, id: ApplicantId) -> Result<Transition, SetupError> {
        let transition = self.participant_mut(id)?.withdraw();
        debug!(applicant = %id, applied = transition.is_applied(), "withdrawal requested");
        Ok(transition)
    }

    /// Caller-issued rejection. Already finalized applicants are left untouched.
    pub fn reject(&mut self, id: ApplicantId) -> Result<Transition, SetupError> {
        let transition = self.participant_mut(id)?.reject();
        debug!(applicant = %id, applied = transition.is_applied(), "rejection requested");
        Ok(transition)
    }

    /// Runs rounds until the fixed point and returns the final report.
    pub fn run(&mut self) -> Result<AllocationReport, AllocationFault> {
        while self.step()?.is_some() {}

        let report = self.report();
        let counts = report.summary();
        info!(
            rounds = self.round,
            accepted = counts.accepted,
            rejected = counts.rejected,
            withdrawn = counts.withdrawn,
            "allocation reached fixed point"
        );
        Ok(report)
    }

    /// Executes one round. Returns `None` once no applicant has anything left to propose.
    pub fn step(&mut self) -> Result<Option<RoundSummary>, AllocationFault> {
        if self.settled {
            return Ok(None);
        }

        // Lists that were empty from the start never produce a proposal.
        let exhausted_upfront = self.reject_exhausted();

        let batches = self.collect_proposals();
        let proposals: usize = batches.iter().map(Vec::len).sum();
        if proposals == 0 {
            self.settled = true;
            return Ok(None);
        }

        self.round += 1;
        let mut summary = RoundSummary {
            round: self.round,
            proposals,
            exhausted: exhausted_upfront,
            ..RoundSummary::default()
        };

        let verdicts = self.adjudicate(&batches);
        self.commit(verdicts, &mut summary)?;
        summary.exhausted += self.reject_exhausted();

        debug!(
            round = summary.round,
            proposals = summary.proposals,
            admitted = summary.admitted,
            outranked = summary.outranked,
            ineligible = summary.ineligible,
            exhausted = summary.exhausted,
            "round committed"
        );
        self.history.push(summary);
        Ok(Some(summary))
    }

    pub fn report(&self) -> AllocationReport {
        AllocationReport::capture(
            self.round,
            &self.history,
            &self.participants,
            &self.positions,
        )
    }

    fn participant_mut(&mut self, id: ApplicantId) -> Result<&mut P, SetupError> {
        self.participants
            .iter_mut()
            .find(|participant| participant.id() == id)
            .ok_or(SetupError::UnknownApplicant(id))
    }

    fn collect_proposals(&self) -> Vec<Vec<usize>> {
        let mut batches = vec![Vec::new(); self.positions.len()];
        for (index, participant) in self.participants.iter().enumerate() {
            if participant.is_finalized() {
                continue;
            }
            if let Some(target) = participant.preferences().current() {
                batches[target.index()].push(index);
            }
        }
        batches
    }

    fn adjudicate(&self, batches: &[Vec<usize>]) -> Vec<BatchVerdict> {
        let participants = self.participants.as_slice();
        let active = batches.iter().filter(|batch| !batch.is_empty()).count();

        if active >= self.parallel_threshold {
            self.positions
                .par_iter()
                .zip(batches.par_iter())
                .map(|(position, batch)| adjudicate_batch(position, batch, participants))
                .collect()
        } else {
            self.positions
                .iter()
                .zip(batches)
                .map(|(position, batch)| adjudicate_batch(position, batch, participants))
                .collect()
        }
    }

    fn commit(
        &mut self,
        verdicts: Vec<BatchVerdict>,
        summary: &mut RoundSummary,
    ) -> Result<(), AllocationFault> {
        for (slot, verdict) in verdicts.into_iter().enumerate() {
            let target = PositionRef(slot);
            for &index in &verdict.admitted {
                self.admit(index, target)?;
            }
            for &index in verdict.outranked.iter().chain(&verdict.ineligible) {
                self.participants[index].preferences_mut().advance();
            }

            summary.admitted += verdict.admitted.len();
            summary.outranked += verdict.outranked.len();
            summary.ineligible += verdict.ineligible.len();
        }
        Ok(())
    }

    fn admit(&mut self, index: usize, target: PositionRef) -> Result<(), AllocationFault> {
        let id = self.participants[index].id();
        let state = self.participants[index].state();
        if state.is_finalized() {
            return Err(self.fault(FaultKind::FinalizedMutation {
                applicant: id,
                state: state.label(),
            }));
        }

        let position = &mut self.positions[target.index()];
        if let Err(err) = position.admit(id) {
            let kind = match err {
                AdmissionError::Full => FaultKind::CapacityExceeded {
                    location: position.location().to_string(),
                    capacity: position.capacity(),
                    applicant: id,
                },
                AdmissionError::AlreadyAdmitted => FaultKind::DuplicateAdmission {
                    applicant: id,
                    location: position.location().to_string(),
                },
            };
            return Err(self.fault(kind));
        }

        let transition = self.participants[index].decision_mut().admit(target);
        match transition {
            Transition::Applied => {
                debug!(
                    applicant = %id,
                    location = self.positions[target.index()].location(),
                    "admitted"
                );
                Ok(())
            }
            Transition::Ignored => Err(self.fault(FaultKind::FinalizedMutation {
                applicant: id,
                state: state.label(),
            })),
        }
    }

    fn reject_exhausted(&mut self) -> usize {
        let mut exhausted = 0;
        for participant in &mut self.participants {
            if participant.is_finalized() || !participant.preferences().is_exhausted() {
                continue;
            }
            if participant.decision_mut().exhaust().is_applied() {
                debug!(applicant = %participant.id(), "preferences exhausted");
                exhausted += 1;
            }
        }
        exhausted
    }

    fn fault(&self, kind: FaultKind) -> AllocationFault {
        let dump = Box::new(self.report());
        error!(
            round = self.round,
            fault = %kind,
            state = %serde_json::to_string(&*dump).unwrap_or_default(),
            "allocation aborted on internal consistency fault"
        );
        AllocationFault {
            round: self.round,
            kind,
            dump,
        }
    }
}

/// Ranks one station's proposals against its remaining capacity. Read-only, so batches for
/// different stations can be evaluated concurrently.
fn adjudicate_batch<P>(position: &Position, batch: &[usize], participants: &[P]) -> BatchVerdict
where
    P: Participant,
{
    let mut verdict = BatchVerdict::default();
    if batch.is_empty() {
        return verdict;
    }

    let mut eligible = Vec::with_capacity(batch.len());
    for &index in batch {
        let participant = &participants[index];
        match eligibility::check(participant, position) {
            Ok(()) => eligible.push(index),
            Err(reason) => {
                debug!(
                    applicant = %participant.id(),
                    location = position.location(),
                    %reason,
                    "proposal filtered"
                );
                verdict.ineligible.push(index);
            }
        }
    }

    eligible.sort_by(|&a, &b| ranking::rank(&participants[a], &participants[b]));
    let cut = position.remaining().min(eligible.len());
    verdict.outranked = eligible.split_off(cut);
    verdict.admitted = eligible;
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::applicant::{ApplicantState, Outcome};

    fn applicant(id: u32, score: f32, preferences: &[usize]) -> Applicant {
        Applicant::new(
            ApplicantId(id),
            format!("student-{id}"),
            score,
            "EE",
            Vec::<String>::new(),
            preferences.iter().copied().map(PositionRef).collect(),
        )
    }

    fn station(location: &str, capacity: usize) -> Position {
        Position::new(location, capacity, 5.0).with_categories(["EE"])
    }

    #[test]
    fn new_rejects_duplicate_ids() {
        let err = AllocationEngine::new(
            vec![applicant(1, 9.0, &[0]), applicant(1, 8.0, &[0])],
            vec![station("A", 1)],
        )
        .expect_err("duplicate ids");
        assert_eq!(err, SetupError::DuplicateApplicant(ApplicantId(1)));
    }

    #[test]
    fn new_rejects_malformed_numbers() {
        let err = AllocationEngine::new(vec![applicant(1, f32::NAN, &[0])], vec![station("A", 1)])
            .expect_err("nan score");
        assert_eq!(err, SetupError::NonFiniteScore(ApplicantId(1)));

        let err = AllocationEngine::new(vec![applicant(1, 9.0, &[0])], vec![station("A", 0)])
            .expect_err("zero capacity");
        assert_eq!(err, SetupError::ZeroCapacity("A".to_string()));

        let open = Position::new("B", 1, f32::INFINITY).with_categories(["EE"]);
        let err = AllocationEngine::new(vec![applicant(1, 9.0, &[0])], vec![open])
            .expect_err("infinite cutoff");
        assert_eq!(err, SetupError::NonFiniteCutoff("B".to_string()));
    }

    #[test]
    fn new_rejects_dangling_preferences() {
        let err = AllocationEngine::new(vec![applicant(1, 9.0, &[0, 3])], vec![station("A", 1)])
            .expect_err("preference outside table");
        assert_eq!(
            err,
            SetupError::PositionOutOfRange {
                applicant: ApplicantId(1),
                position: 3
            }
        );
    }

    #[test]
    fn step_reports_round_counters() {
        let mut engine = AllocationEngine::new(
            vec![
                applicant(1, 9.0, &[0, 1]),
                applicant(2, 9.5, &[0]),
                applicant(3, 4.0, &[1]),
            ],
            vec![station("A", 1), station("B", 1)],
        )
        .expect("valid engine");

        let first = engine.step().expect("no fault").expect("round ran");
        assert_eq!(first.round, 1);
        assert_eq!(first.proposals, 3);
        assert_eq!(first.admitted, 1);
        assert_eq!(first.outranked, 1);
        assert_eq!(first.ineligible, 1);
        assert_eq!(first.exhausted, 1);

        let second = engine.step().expect("no fault").expect("round ran");
        assert_eq!(second.proposals, 1);
        assert_eq!(second.admitted, 1);

        assert!(engine.step().expect("no fault").is_none());
        assert!(engine.is_settled());
        assert_eq!(engine.round(), 2);
        assert_eq!(engine.history().len(), 2);
    }

    #[test]
    fn run_is_a_noop_after_fixed_point() {
        let mut engine = AllocationEngine::new(vec![applicant(1, 9.0, &[0])], vec![station("A", 1)])
            .expect("valid engine");
        let first = engine.run().expect("runs");
        let second = engine.run().expect("runs again");
        assert_eq!(first, second);
        assert_eq!(second.rounds, 1);
    }

    #[test]
    fn empty_preferences_are_rejected_without_a_round() {
        let mut engine = AllocationEngine::new(vec![applicant(1, 9.0, &[])], vec![station("A", 1)])
            .expect("valid engine");
        let report = engine.run().expect("runs");
        assert_eq!(report.rounds, 0);
        assert!(report.history.is_empty());
        assert_eq!(report.summary().rejected, 1);
        assert_eq!(
            engine.participants()[0].state(),
            ApplicantState::Rejected {
                cause: crate::allocation::RejectionCause::PreferencesExhausted
            }
        );
    }

    #[test]
    fn empty_lists_are_counted_in_the_first_round_that_runs() {
        let mut engine = AllocationEngine::new(
            vec![applicant(1, 9.0, &[]), applicant(2, 8.0, &[0])],
            vec![station("A", 1)],
        )
        .expect("valid engine");

        let report = engine.run().expect("runs");
        assert_eq!(report.history.len(), 1);
        assert_eq!(report.history[0].exhausted, 1);
        assert_eq!(report.history[0].admitted, 1);
    }

    #[test]
    fn admitting_into_full_station_is_a_fault() {
        let mut engine = AllocationEngine::new(
            vec![applicant(1, 9.0, &[0]), applicant(2, 8.0, &[0])],
            vec![station("A", 1)],
        )
        .expect("valid engine");
        engine.positions[0].admit(ApplicantId(9)).expect("seed");

        let fault = engine.admit(0, PositionRef(0)).expect_err("over capacity");
        assert!(matches!(fault.kind, FaultKind::CapacityExceeded { capacity: 1, .. }));
        assert_eq!(fault.dump.positions[0].held, 1);
        assert_eq!(engine.participants()[0].state(), ApplicantState::Pending);
    }

    #[test]
    fn admitting_finalized_applicant_is_a_fault() {
        let mut engine = AllocationEngine::new(vec![applicant(1, 9.0, &[0])], vec![station("A", 2)])
            .expect("valid engine");
        assert!(engine.withdraw(ApplicantId(1)).expect("known").is_applied());

        let fault = engine.admit(0, PositionRef(0)).expect_err("finalized");
        assert_eq!(
            fault.kind,
            FaultKind::FinalizedMutation {
                applicant: ApplicantId(1),
                state: "withdrawn"
            }
        );
        assert_eq!(engine.positions()[0].held(), 0);
        assert_eq!(fault.dump.applicants[0].outcome, Outcome::Withdrawn);
    }

    #[test]
    fn unknown_applicant_requests_are_setup_errors() {
        let mut engine = AllocationEngine::new(vec![applicant(1, 9.0, &[0])], vec![station("A", 1)])
            .expect("valid engine");
        assert_eq!(
            engine.reject(ApplicantId(42)),
            Err(SetupError::UnknownApplicant(ApplicantId(42)))
        );
    }

    #[test]
    fn adjudicate_batch_cuts_at_remaining_capacity() {
        let participants = vec![
            applicant(1, 7.0, &[0]),
            applicant(2, 9.0, &[0]),
            applicant(3, 8.0, &[0]),
        ];
        let mut position = station("A", 3);
        position.admit(ApplicantId(99)).expect("seed");

        let verdict = adjudicate_batch(&position, &[0, 1, 2], &participants);
        assert_eq!(verdict.admitted, vec![1, 2]);
        assert_eq!(verdict.outranked, vec![0]);
        assert!(verdict.ineligible.is_empty());
    }
}
