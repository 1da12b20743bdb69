use std::collections::BTreeSet;

use serde::Serialize;

use super::domain::ApplicantId;

/// Capacity-bounded station with an admission cutoff and prerequisite set.
///
/// A specialized station (for example an electronics station with a domain) is the same
/// type carrying a `specialization` tag; the tag never influences matching.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    location: String,
    stipend: u32,
    capacity: usize,
    cutoff: f32,
    categories: BTreeSet<String>,
    required_attributes: BTreeSet<String>,
    specialization: Option<String>,
    admitted: Vec<ApplicantId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdmissionError {
    Full,
    AlreadyAdmitted,
}

impl Position {
    pub fn new(location: impl Into<String>, capacity: usize, cutoff: f32) -> Self {
        Self {
            location: location.into(),
            stipend: 0,
            capacity,
            cutoff,
            categories: BTreeSet::new(),
            required_attributes: BTreeSet::new(),
            specialization: None,
            admitted: Vec::new(),
        }
    }

    pub fn with_categories<S: Into<String>>(
        mut self,
        categories: impl IntoIterator<Item = S>,
    ) -> Self {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_required_attributes<S: Into<String>>(
        mut self,
        attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.required_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_stipend(mut self, stipend: u32) -> Self {
        self.stipend = stipend;
        self
    }

    pub fn with_specialization(mut self, specialization: impl Into<String>) -> Self {
        self.specialization = Some(specialization.into());
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn stipend(&self) -> u32 {
        self.stipend
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn required_attributes(&self) -> &BTreeSet<String> {
        &self.required_attributes
    }

    pub fn specialization(&self) -> Option<&str> {
        self.specialization.as_deref()
    }

    /// Applicants admitted so far, in admission order.
    pub fn admitted(&self) -> &[ApplicantId] {
        &self.admitted
    }

    pub fn held(&self) -> usize {
        self.admitted.len()
    }

    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.admitted.len())
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn admit(&mut self, applicant: ApplicantId) -> Result<(), AdmissionError> {
        if self.is_full() {
            return Err(AdmissionError::Full);
        }
        if self.admitted.contains(&applicant) {
            return Err(AdmissionError::AlreadyAdmitted);
        }
        self.admitted.push(applicant);
        Ok(())
    }
}
