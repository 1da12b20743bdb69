//! CSV import for allocation inputs.
//!
//! Three exports feed one run: the station table, the applicant table and a long-format
//! preference table with one row per ranked choice. The importer only assembles an
//! [`AllocationRequest`]; validation happens in [`Roster`](crate::allocation::Roster).

mod parser;

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::allocation::{AllocationRequest, ApplicantId};

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    OrphanPreference {
        applicant: ApplicantId,
        location: String,
    },
    DuplicateRank {
        applicant: ApplicantId,
        rank: u32,
    },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read allocation export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid allocation CSV data: {}", err),
            ImportError::OrphanPreference { applicant, location } => write!(
                f,
                "preference for `{}` references unknown applicant {}",
                location, applicant
            ),
            ImportError::DuplicateRank { applicant, rank } => write!(
                f,
                "applicant {} has more than one preference at rank {}",
                applicant, rank
            ),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::OrphanPreference { .. } | ImportError::DuplicateRank { .. } => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn from_paths<P: AsRef<Path>>(
        positions: P,
        applicants: P,
        preferences: P,
    ) -> Result<AllocationRequest, ImportError> {
        Self::from_readers(
            std::fs::File::open(positions)?,
            std::fs::File::open(applicants)?,
            std::fs::File::open(preferences)?,
        )
    }

    /// Preference rows may arrive in any order; each applicant's list is sorted by rank.
    pub fn from_readers<A: Read, B: Read, C: Read>(
        positions: A,
        applicants: B,
        preferences: C,
    ) -> Result<AllocationRequest, ImportError> {
        let positions = parser::parse_positions(positions)?;
        let mut applicants = parser::parse_applicants(applicants)?;

        let slot_by_id: HashMap<u32, usize> = applicants
            .iter()
            .enumerate()
            .map(|(slot, record)| (record.id, slot))
            .collect();
        let mut ranked: HashMap<usize, BTreeMap<u32, String>> = HashMap::new();

        for row in parser::parse_preferences(preferences)? {
            let applicant = ApplicantId(row.applicant_id);
            let slot = *slot_by_id
                .get(&row.applicant_id)
                .ok_or_else(|| ImportError::OrphanPreference {
                    applicant,
                    location: row.location.clone(),
                })?;
            if ranked
                .entry(slot)
                .or_default()
                .insert(row.rank, row.location)
                .is_some()
            {
                return Err(ImportError::DuplicateRank {
                    applicant,
                    rank: row.rank,
                });
            }
        }

        for (slot, choices) in ranked {
            applicants[slot].preferences = choices.into_values().collect();
        }

        debug!(
            positions = positions.len(),
            applicants = applicants.len(),
            "allocation export parsed"
        );
        Ok(AllocationRequest {
            positions,
            applicants,
            withdrawals: Vec::new(),
        })
    }
}
