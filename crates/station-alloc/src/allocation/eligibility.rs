use serde::Serialize;

use super::applicant::Participant;
use super::position::Position;

/// Reason a proposal was filtered before ranking.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum Ineligibility {
    #[error("category {category} is not accepted")]
    CategoryNotAccepted { category: String },
    #[error("missing required attributes: {}", .missing.join(", "))]
    MissingAttributes { missing: Vec<String> },
    #[error("score {score:.2} below cutoff {cutoff:.2}")]
    BelowCutoff { score: f32, cutoff: f32 },
}

/// Admissibility of `applicant` at `position`: accepted category, every required attribute
/// held, and a score at or above the cutoff.
pub fn is_eligible<P: Participant + ?Sized>(applicant: &P, position: &Position) -> bool {
    position.categories().contains(applicant.category())
        && position
            .required_attributes()
            .is_subset(applicant.attributes())
        && meets_cutoff(applicant.score(), position.cutoff())
}

/// False whenever either side is NaN.
fn meets_cutoff(score: f32, cutoff: f32) -> bool {
    score >= cutoff
}

/// Same predicate as [`is_eligible`], reporting the first failed condition.
pub fn check<P: Participant + ?Sized>(
    applicant: &P,
    position: &Position,
) -> Result<(), Ineligibility> {
    if !position.categories().contains(applicant.category()) {
        return Err(Ineligibility::CategoryNotAccepted {
            category: applicant.category().to_string(),
        });
    }

    let missing: Vec<String> = position
        .required_attributes()
        .difference(applicant.attributes())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(Ineligibility::MissingAttributes { missing });
    }

    if !meets_cutoff(applicant.score(), position.cutoff()) {
        return Err(Ineligibility::BelowCutoff {
            score: applicant.score(),
            cutoff: position.cutoff(),
        });
    }

    Ok(())
}
