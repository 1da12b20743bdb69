use serde::{Deserialize, Deserializer};
use std::io::Read;

use crate::allocation::{ApplicantRecord, PositionRecord};

/// One row of a preferences export: the applicant's `rank`-th choice is `location`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct PreferenceRow {
    pub(crate) applicant_id: u32,
    pub(crate) rank: u32,
    pub(crate) location: String,
}

#[derive(Debug, Deserialize)]
struct PositionRow {
    location: String,
    #[serde(default)]
    stipend: Option<u32>,
    categories: String,
    cutoff: f32,
    capacity: u32,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    required_attributes: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    specialization: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApplicantRow {
    id: u32,
    name: String,
    score: f32,
    category: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    attributes: Option<String>,
}

fn reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

pub(crate) fn parse_positions<R: Read>(input: R) -> Result<Vec<PositionRecord>, csv::Error> {
    let mut records = Vec::new();
    for row in reader(input).deserialize::<PositionRow>() {
        let row = row?;
        records.push(PositionRecord {
            location: row.location,
            stipend: row.stipend.unwrap_or_default(),
            categories: split_list(&row.categories),
            required_attributes: row
                .required_attributes
                .as_deref()
                .map(split_list)
                .unwrap_or_default(),
            cutoff: row.cutoff,
            capacity: row.capacity,
            specialization: row.specialization,
        });
    }
    Ok(records)
}

pub(crate) fn parse_applicants<R: Read>(input: R) -> Result<Vec<ApplicantRecord>, csv::Error> {
    let mut records = Vec::new();
    for row in reader(input).deserialize::<ApplicantRow>() {
        let row = row?;
        records.push(ApplicantRecord {
            id: row.id,
            name: row.name,
            score: row.score,
            category: row.category,
            attributes: row
                .attributes
                .as_deref()
                .map(split_list)
                .unwrap_or_default(),
            preferences: Vec::new(),
        });
    }
    Ok(records)
}

pub(crate) fn parse_preferences<R: Read>(input: R) -> Result<Vec<PreferenceRow>, csv::Error> {
    reader(input).deserialize::<PreferenceRow>().collect()
}

/// Splits a `;`-separated cell, dropping blanks.
pub(crate) fn split_list(cell: &str) -> Vec<String> {
    cell.split(';')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
