use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable numeric identity of an applicant. Lower ids win score ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub u32);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved index of a position inside an engine's position table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionRef(pub usize);

impl PositionRef {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Station description as handed over by an importer or API caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub location: String,
    #[serde(default)]
    pub stipend: u32,
    pub categories: Vec<String>,
    #[serde(default)]
    pub required_attributes: Vec<String>,
    pub cutoff: f32,
    pub capacity: u32,
    #[serde(default)]
    pub specialization: Option<String>,
}

/// Applicant description; preferences name stations by location, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub id: u32,
    pub name: String,
    pub score: f32,
    pub category: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub preferences: Vec<String>,
}

/// Complete input for a single allocation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub positions: Vec<PositionRecord>,
    pub applicants: Vec<ApplicantRecord>,
    /// Applicants opting out before the first round.
    #[serde(default)]
    pub withdrawals: Vec<ApplicantId>,
}
