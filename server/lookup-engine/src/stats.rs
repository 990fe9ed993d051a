//! Per-domain aggregate statistics, computed in a single pass.

use crate::config::Config;
use crate::normalize::clamp_unit;
use crate::types::{ConfidenceBreakdown, DomainStats, ErrorCanon, Resolvable, ResolvableBreakdown};

/// Aggregate one domain's canons. Returns `None` for an empty slice.
///
/// - `avg_fix_rate`: mean of clamped `fix_success_rate`.
/// - `resolvable_fraction`: share of canons with `resolvable == true`.
/// - `confidence_breakdown`: verdict confidence bucketed at the configured
///   high / medium thresholds.
pub fn domain_stats(domain: &str, canons: &[&ErrorCanon], config: &Config) -> Option<DomainStats> {
  if canons.is_empty() {
    return None;
  }

  let mut fix_sum = 0.0;
  let mut resolvable = ResolvableBreakdown::default();
  let mut confidence = ConfidenceBreakdown::default();

  for canon in canons {
    fix_sum += clamp_unit(canon.verdict.fix_success_rate);

    match canon.verdict.resolvable {
      Resolvable::True => resolvable.resolvable += 1,
      Resolvable::Partial => resolvable.partial += 1,
      Resolvable::False => resolvable.unresolvable += 1,
    }

    let c = clamp_unit(canon.verdict.confidence);
    if c >= config.high_confidence {
      confidence.high += 1;
    } else if c >= config.medium_confidence {
      confidence.medium += 1;
    } else {
      confidence.low += 1;
    }
  }

  let count = canons.len();
  Some(DomainStats {
    domain: domain.to_string(),
    count,
    avg_fix_rate: (fix_sum / count as f64 * 1000.0).round() / 1000.0,
    resolvable_fraction: resolvable.resolvable as f64 / count as f64,
    resolvable_breakdown: resolvable,
    confidence_breakdown: confidence,
  })
}
