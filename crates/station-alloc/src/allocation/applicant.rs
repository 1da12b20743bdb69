use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use super::domain::{ApplicantId, PositionRef};
use super::eligibility;
use super::position::Position;
use super::preference::PreferenceList;

/// Why an applicant ended up rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCause {
    /// Every preference was considered without an admission.
    PreferencesExhausted,
    /// Rejection issued explicitly by the caller.
    Caller,
}

/// Outcome of an applicant. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ApplicantState {
    #[default]
    Pending,
    Accepted {
        position: PositionRef,
    },
    Rejected {
        cause: RejectionCause,
    },
    Withdrawn,
}

/// State with its payload stripped, as shown in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

impl Outcome {
    pub const fn label(self) -> &'static str {
        match self {
            Outcome::Pending => "pending",
            Outcome::Accepted => "accepted",
            Outcome::Rejected => "rejected",
            Outcome::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ApplicantState {
    pub const fn outcome(self) -> Outcome {
        match self {
            ApplicantState::Pending => Outcome::Pending,
            ApplicantState::Accepted { .. } => Outcome::Accepted,
            ApplicantState::Rejected { .. } => Outcome::Rejected,
            ApplicantState::Withdrawn => Outcome::Withdrawn,
        }
    }

    pub const fn label(self) -> &'static str {
        self.outcome().label()
    }

    pub const fn is_finalized(self) -> bool {
        !matches!(self, ApplicantState::Pending)
    }

    /// Admitting position for accepted applicants.
    pub const fn position(self) -> Option<PositionRef> {
        match self {
            ApplicantState::Accepted { position } => Some(position),
            _ => None,
        }
    }
}

/// Result of a requested state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Transition {
    Applied,
    /// The applicant was already finalized; nothing changed.
    Ignored,
}

impl Transition {
    pub const fn is_applied(self) -> bool {
        matches!(self, Transition::Applied)
    }
}

/// Write-once holder for an applicant's outcome.
///
/// Leaving `Pending` is the only permitted move, and it happens at most once. Admission is
/// reserved to the engine, so callers can only reject or withdraw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Decision {
    state: ApplicantState,
}

impl Decision {
    pub fn state(&self) -> ApplicantState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state.is_finalized()
    }

    pub(crate) fn admit(&mut self, position: PositionRef) -> Transition {
        self.settle(ApplicantState::Accepted { position })
    }

    pub(crate) fn exhaust(&mut self) -> Transition {
        self.settle(ApplicantState::Rejected {
            cause: RejectionCause::PreferencesExhausted,
        })
    }

    fn reject(&mut self) -> Transition {
        self.settle(ApplicantState::Rejected {
            cause: RejectionCause::Caller,
        })
    }

    fn withdraw(&mut self) -> Transition {
        self.settle(ApplicantState::Withdrawn)
    }

    fn settle(&mut self, next: ApplicantState) -> Transition {
        if self.state.is_finalized() || !next.is_finalized() {
            return Transition::Ignored;
        }
        self.state = next;
        Transition::Applied
    }
}

/// Capabilities the engine relies on. Any participant kind exposing these can be matched.
pub trait Participant {
    fn id(&self) -> ApplicantId;
    fn name(&self) -> &str;
    fn score(&self) -> f32;
    fn category(&self) -> &str;
    fn attributes(&self) -> &BTreeSet<String>;
    fn preferences(&self) -> &PreferenceList;
    fn preferences_mut(&mut self) -> &mut PreferenceList;
    fn decision(&self) -> &Decision;
    fn decision_mut(&mut self) -> &mut Decision;

    fn state(&self) -> ApplicantState {
        self.decision().state()
    }

    fn is_finalized(&self) -> bool {
        self.decision().is_finalized()
    }

    fn is_eligible(&self, position: &Position) -> bool {
        eligibility::is_eligible(self, position)
    }

    /// Caller-issued rejection. Ignored once finalized.
    fn reject(&mut self) -> Transition {
        self.decision_mut().reject()
    }

    /// Applicant opts out. Ignored once finalized.
    fn withdraw(&mut self) -> Transition {
        self.decision_mut().withdraw()
    }
}

/// A student competing for stations.
#[derive(Debug, Clone, Serialize)]
pub struct Applicant {
    id: ApplicantId,
    name: String,
    score: f32,
    category: String,
    attributes: BTreeSet<String>,
    preferences: PreferenceList,
    decision: Decision,
}

impl Applicant {
    pub fn new<S>(
        id: ApplicantId,
        name: impl Into<String>,
        score: f32,
        category: impl Into<String>,
        attributes: impl IntoIterator<Item = S>,
        preferences: PreferenceList,
    ) -> Self
    where
        S: Into<String>,
    {
        Self {
            id,
            name: name.into(),
            score,
            category: category.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
            preferences,
            decision: Decision::default(),
        }
    }
}

impl Participant for Applicant {
    fn id(&self) -> ApplicantId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self) -> f32 {
        self.score
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn attributes(&self) -> &BTreeSet<String> {
        &self.attributes
    }

    fn preferences(&self) -> &PreferenceList {
        &self.preferences
    }

    fn preferences_mut(&mut self) -> &mut PreferenceList {
        &mut self.preferences
    }

    fn decision(&self) -> &Decision {
        &self.decision
    }

    fn decision_mut(&mut self) -> &mut Decision {
        &mut self.decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applicant() -> Applicant {
        Applicant::new(
            ApplicantId(7),
            "Asha",
            8.4,
            "EE",
            ["circuits"],
            PreferenceList::new(vec![PositionRef(0)]),
        )
    }

    #[test]
    fn new_applicants_start_pending() {
        let applicant = applicant();
        assert_eq!(applicant.state(), ApplicantState::Pending);
        assert!(!applicant.is_finalized());
        assert_eq!(applicant.state().label(), "pending");
    }

    #[test]
    fn withdrawal_finalizes_once() {
        let mut applicant = applicant();
        assert_eq!(applicant.withdraw(), Transition::Applied);
        assert_eq!(applicant.state(), ApplicantState::Withdrawn);

        assert_eq!(applicant.reject(), Transition::Ignored);
        assert_eq!(applicant.withdraw(), Transition::Ignored);
        assert_eq!(
            applicant.decision_mut().admit(PositionRef(0)),
            Transition::Ignored
        );
        assert_eq!(applicant.state(), ApplicantState::Withdrawn);
    }

    #[test]
    fn acceptance_cannot_be_undone() {
        let mut applicant = applicant();
        assert!(applicant.decision_mut().admit(PositionRef(3)).is_applied());

        assert_eq!(applicant.reject(), Transition::Ignored);
        assert_eq!(applicant.withdraw(), Transition::Ignored);
        assert_eq!(applicant.decision_mut().exhaust(), Transition::Ignored);
        assert_eq!(applicant.state().position(), Some(PositionRef(3)));
    }

    #[test]
    fn caller_rejection_is_distinguished_from_exhaustion() {
        let mut rejected = applicant();
        assert!(rejected.reject().is_applied());
        assert_eq!(
            rejected.state(),
            ApplicantState::Rejected {
                cause: RejectionCause::Caller
            }
        );

        let mut exhausted = applicant();
        assert!(exhausted.decision_mut().exhaust().is_applied());
        assert_eq!(
            exhausted.state(),
            ApplicantState::Rejected {
                cause: RejectionCause::PreferencesExhausted
            }
        );
    }

    #[test]
    fn pending_is_never_a_settle_target() {
        let mut decision = Decision::default();
        assert_eq!(
            decision.settle(ApplicantState::Pending),
            Transition::Ignored
        );
        assert!(!decision.is_finalized());
    }
}
