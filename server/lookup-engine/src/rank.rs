//! Total ordering of the candidates for one query.

use std::cmp::Ordering;

use crate::normalize::clamp_unit;
use crate::types::Candidate;

/// Sort candidates best-first and keep the top `max`.
///
/// Order: confidence desc, exact before fuzzy, fix_success_rate desc, then
/// canon id asc so repeated queries against the same corpus always produce
/// the same list.
pub fn rank(mut candidates: Vec<Candidate>, max: usize) -> Vec<Candidate> {
  candidates.sort_by(compare);
  candidates.truncate(max);
  candidates
}

pub fn compare(a: &Candidate, b: &Candidate) -> Ordering {
  clamp_unit(b.confidence)
    .total_cmp(&clamp_unit(a.confidence))
    .then_with(|| b.match_kind.priority().cmp(&a.match_kind.priority()))
    .then_with(|| clamp_unit(b.fix_success_rate).total_cmp(&clamp_unit(a.fix_success_rate)))
    .then_with(|| a.canon_id.cmp(&b.canon_id))
}
