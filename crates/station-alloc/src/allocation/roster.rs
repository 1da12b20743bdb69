use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::applicant::Applicant;
use super::domain::{AllocationRequest, ApplicantId, ApplicantRecord, PositionRecord, PositionRef};
use super::engine::AllocationEngine;
use super::position::Position;
use super::preference::PreferenceList;

/// Input rejected before the first round runs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetupError {
    #[error("{record} record `{key}` has an empty `{field}`")]
    EmptyField {
        record: &'static str,
        key: String,
        field: &'static str,
    },
    #[error("position `{0}` is declared more than once")]
    DuplicatePosition(String),
    #[error("position `{0}` must have a positive capacity")]
    ZeroCapacity(String),
    #[error("position `{0}` has a non-finite cutoff")]
    NonFiniteCutoff(String),
    #[error("applicant {0} has a non-finite score")]
    NonFiniteScore(ApplicantId),
    #[error("applicant id {0} is declared more than once")]
    DuplicateApplicant(ApplicantId),
    #[error("applicant {applicant} prefers unknown position `{location}`")]
    UnknownPosition {
        applicant: ApplicantId,
        location: String,
    },
    #[error("applicant {applicant} references position index {position} outside the table")]
    PositionOutOfRange {
        applicant: ApplicantId,
        position: usize,
    },
    #[error("applicant {applicant} lists position `{location}` more than once")]
    DuplicatePreference {
        applicant: ApplicantId,
        location: String,
    },
    #[error("applicant {0} is not part of this run")]
    UnknownApplicant(ApplicantId),
}

/// Validates raw records and resolves preference locations into an engine.
pub struct Roster;

impl Roster {
    pub fn build(
        positions: Vec<PositionRecord>,
        applicants: Vec<ApplicantRecord>,
    ) -> Result<AllocationEngine, SetupError> {
        let mut table = Vec::with_capacity(positions.len());
        let mut index_by_location: HashMap<String, PositionRef> = HashMap::new();

        for record in positions {
            let position = position_from_record(record)?;
            let reference = PositionRef(table.len());
            if index_by_location
                .insert(position.location().to_string(), reference)
                .is_some()
            {
                return Err(SetupError::DuplicatePosition(position.location().to_string()));
            }
            table.push(position);
        }

        let mut participants = Vec::with_capacity(applicants.len());
        for record in applicants {
            participants.push(applicant_from_record(record, &index_by_location)?);
        }

        debug!(
            positions = table.len(),
            applicants = participants.len(),
            "roster validated"
        );
        AllocationEngine::new(participants, table)
    }

    /// Builds the engine and applies the request's withdrawals before any round runs.
    pub fn from_request(request: AllocationRequest) -> Result<AllocationEngine, SetupError> {
        let AllocationRequest {
            positions,
            applicants,
            withdrawals,
        } = request;

        let mut engine = Self::build(positions, applicants)?;
        for id in withdrawals {
            let _ = engine.withdraw(id)?;
        }
        Ok(engine)
    }
}

fn position_from_record(record: PositionRecord) -> Result<Position, SetupError> {
    let PositionRecord {
        location,
        stipend,
        categories,
        required_attributes,
        cutoff,
        capacity,
        specialization,
    } = record;

    let location = location.trim().to_string();
    if location.is_empty() {
        return Err(SetupError::EmptyField {
            record: "position",
            key: String::new(),
            field: "location",
        });
    }
    let categories = clean_tags(categories);
    if categories.is_empty() {
        return Err(SetupError::EmptyField {
            record: "position",
            key: location,
            field: "categories",
        });
    }

    let mut position = Position::new(location, capacity as usize, cutoff)
        .with_stipend(stipend)
        .with_categories(categories)
        .with_required_attributes(clean_tags(required_attributes));
    if let Some(tag) = specialization.map(|tag| tag.trim().to_string()) {
        if !tag.is_empty() {
            position = position.with_specialization(tag);
        }
    }
    Ok(position)
}

fn applicant_from_record(
    record: ApplicantRecord,
    index_by_location: &HashMap<String, PositionRef>,
) -> Result<Applicant, SetupError> {
    let ApplicantRecord {
        id,
        name,
        score,
        category,
        attributes,
        preferences,
    } = record;
    let id = ApplicantId(id);

    let category = category.trim().to_string();
    if category.is_empty() {
        return Err(SetupError::EmptyField {
            record: "applicant",
            key: id.to_string(),
            field: "category",
        });
    }

    let mut seen = HashSet::with_capacity(preferences.len());
    let mut order = Vec::with_capacity(preferences.len());
    for location in preferences {
        let location = location.trim().to_string();
        let reference = *index_by_location
            .get(&location)
            .ok_or_else(|| SetupError::UnknownPosition {
                applicant: id,
                location: location.clone(),
            })?;
        if !seen.insert(reference) {
            return Err(SetupError::DuplicatePreference {
                applicant: id,
                location,
            });
        }
        order.push(reference);
    }

    Ok(Applicant::new(
        id,
        name.trim(),
        score,
        category,
        clean_tags(attributes),
        PreferenceList::new(order),
    ))
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}
