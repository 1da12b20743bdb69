use std::cmp::Ordering;

use super::applicant::Participant;

/// Strict total order over applicants competing for one station: higher score first,
/// lower id breaks ties.
pub fn rank<P: Participant + ?Sized>(a: &P, b: &P) -> Ordering {
    b.score()
        .total_cmp(&a.score())
        .then_with(|| a.id().cmp(&b.id()))
}
