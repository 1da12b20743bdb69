use serde::Serialize;

use super::domain::PositionRef;

/// Ordered list of stations an applicant will accept, consumed front to back.
///
/// The order is fixed once the list is built. Only the engine moves the cursor, and it
/// never moves backwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreferenceList {
    order: Vec<PositionRef>,
    cursor: usize,
}

impl PreferenceList {
    pub fn new(order: Vec<PositionRef>) -> Self {
        Self { order, cursor: 0 }
    }

    /// The station currently targeted, or `None` once every entry has been consumed.
    pub fn current(&self) -> Option<PositionRef> {
        self.order.get(self.cursor).copied()
    }

    /// Discards the current target. No-op on an exhausted list.
    pub(crate) fn advance(&mut self) {
        if self.cursor < self.order.len() {
            self.cursor += 1;
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.order.len()
    }

    pub fn remaining(&self) -> &[PositionRef] {
        &self.order[self.cursor..]
    }

    pub fn considered(&self) -> &[PositionRef] {
        &self.order[..self.cursor]
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PositionRef> + '_ {
        self.order.iter().copied()
    }
}

impl FromIterator<PositionRef> for PreferenceList {
    fn from_iter<I: IntoIterator<Item = PositionRef>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
