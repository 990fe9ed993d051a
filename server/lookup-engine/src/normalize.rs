//! Validate corpus records at load time and clamp probabilities into range.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::EngineError;
use crate::types::*;

/// Validate one canon and return it with its parsed id.
///
/// Structural problems are `Schema` errors. Out-of-range probabilities are
/// not: they are clamped to [0, 1] (NaN becomes 0) and logged.
pub fn validate(mut canon: ErrorCanon) -> Result<(ErrorCanon, CanonId), EngineError> {
  let origin = if canon.id.is_empty() {
    "<unnamed>".to_string()
  } else {
    canon.id.clone()
  };

  let key = CanonId::parse(&canon.id).ok_or_else(|| {
    EngineError::schema(&origin, "id", "expected {domain}/{slug}/{env}")
  })?;

  require_text(&origin, "error.signature", &canon.signature.signature)?;
  require_text(&origin, "error.regex", &canon.signature.regex)?;
  for pattern in &canon.signature.alt_regexes {
    require_text(&origin, "error.alt_regexes[]", pattern)?;
  }
  require_text(&origin, "error.domain", &canon.signature.domain)?;
  if canon.signature.domain != key.domain {
    return Err(EngineError::schema(
      &origin,
      "error.domain",
      &format!(
        "domain {:?} does not match id domain {:?}",
        canon.signature.domain, key.domain
      ),
    ));
  }

  for de in &canon.dead_ends {
    require_text(&origin, "dead_ends[].action", &de.action)?;
    require_text(&origin, "dead_ends[].why_fails", &de.why_fails)?;
  }
  for wa in &canon.workarounds {
    require_text(&origin, "workarounds[].action", &wa.action)?;
  }

  clamp_field(&origin, "verdict.fix_success_rate", &mut canon.verdict.fix_success_rate);
  clamp_field(&origin, "verdict.confidence", &mut canon.verdict.confidence);
  for de in &mut canon.dead_ends {
    clamp_field(&origin, "dead_ends[].fail_rate", &mut de.fail_rate);
  }
  for wa in &mut canon.workarounds {
    clamp_field(&origin, "workarounds[].success_rate", &mut wa.success_rate);
  }

  let graph = &mut canon.transition_graph;
  for (kind, edges) in [
    (EdgeKind::LeadsTo, &mut graph.leads_to),
    (EdgeKind::PrecededBy, &mut graph.preceded_by),
    (EdgeKind::FrequentlyConfusedWith, &mut graph.frequently_confused_with),
  ] {
    normalize_edges(&origin, kind, edges)?;
  }

  Ok((canon, key))
}

/// Clamp a probability into [0, 1]; NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
  if value.is_nan() {
    0.0
  } else {
    value.clamp(0.0, 1.0)
  }
}

fn clamp_field(origin: &str, field: &str, value: &mut f64) {
  let clamped = clamp_unit(*value);
  if clamped != *value {
    warn!(canon = origin, field, value = *value, clamped, "probability out of range, clamped");
    *value = clamped;
  }
}

fn require_text(origin: &str, field: &str, value: &str) -> Result<(), EngineError> {
  if value.trim().is_empty() {
    return Err(EngineError::schema(origin, field, "must not be empty"));
  }
  Ok(())
}

/// Edge lists are sets: drop repeated ids (first wins) and clamp probabilities.
fn normalize_edges(
  origin: &str,
  kind: EdgeKind,
  edges: &mut Vec<TransitionEdge>,
) -> Result<(), EngineError> {
  let field = format!("transition_graph.{}[].error_id", kind.as_str());
  let mut seen = HashSet::new();
  let before = edges.len();
  for edge in edges.iter() {
    require_text(origin, &field, &edge.error_id)?;
  }
  edges.retain(|e| seen.insert(e.error_id.clone()));
  if edges.len() != before {
    debug!(
      canon = origin,
      edge = kind.as_str(),
      dropped = before - edges.len(),
      "collapsed duplicate transition edges"
    );
  }
  for edge in edges.iter_mut() {
    if let Some(p) = edge.probability.as_mut() {
      clamp_field(origin, "transition_graph[].probability", p);
    }
  }
  Ok(())
}
