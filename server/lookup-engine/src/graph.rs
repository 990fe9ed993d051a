//! Depth-1 expansion of a canon's transition graph into sibling summaries.
//!
//! Edges are resolved strictly as stored: `frequently_confused_with` is not
//! assumed symmetric, and nothing is followed past the first hop, so cycles
//! in the graph cannot cause unbounded work.

use tracing::debug;

use crate::store::CorpusStore;
use crate::types::*;

/// How much of each neighbour to include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphDetail {
  /// Id, domain, signature, verdict and edge metadata only.
  #[default]
  Summary,
  /// Also the neighbour's dead ends and workarounds.
  Full,
}

/// Resolve the three edge sets of `canon` against the store.
///
/// Missing ids go to `unresolved_refs`; the rest of the expansion is still
/// returned.
pub fn expand(store: &CorpusStore, canon: &ErrorCanon, detail: GraphDetail) -> GraphExpansion {
  let mut out = GraphExpansion::default();

  for kind in EdgeKind::ALL {
    let mut resolved = Vec::new();
    for edge in canon.transition_graph.edges(kind) {
      match store.get(&edge.error_id) {
        Some(target) => resolved.push(sibling(target, edge, detail)),
        None => {
          debug!(
            canon = %canon.id,
            edge = kind.as_str(),
            missing = %edge.error_id,
            "unresolved transition reference"
          );
          out.unresolved_refs.push(UnresolvedRef {
            edge: kind,
            error_id: edge.error_id.clone(),
          });
        }
      }
    }
    match kind {
      EdgeKind::LeadsTo => out.leads_to = resolved,
      EdgeKind::PrecededBy => out.preceded_by = resolved,
      EdgeKind::FrequentlyConfusedWith => out.frequently_confused_with = resolved,
    }
  }

  out
}

/// One warning per unresolved reference, for attaching to a lookup result.
pub fn warnings(canon_id: &str, expansion: &GraphExpansion) -> Vec<GraphResolutionWarning> {
  expansion
    .unresolved_refs
    .iter()
    .map(|r| GraphResolutionWarning {
      canon_id: canon_id.to_string(),
      edge: r.edge,
      missing_id: r.error_id.clone(),
      message: format!(
        "{} references {} via {}, which is not in the corpus",
        canon_id,
        r.error_id,
        r.edge.as_str()
      ),
    })
    .collect()
}

fn sibling(target: &ErrorCanon, edge: &TransitionEdge, detail: GraphDetail) -> SiblingSummary {
  let full = detail == GraphDetail::Full;
  SiblingSummary {
    id: target.id.clone(),
    domain: target.domain().to_string(),
    signature: target.signature.signature.clone(),
    resolvable: target.verdict.resolvable,
    fix_success_rate: target.verdict.fix_success_rate,
    probability: edge.probability,
    condition: edge.condition.clone(),
    distinction: edge.distinction.clone(),
    dead_ends: full.then(|| target.dead_ends.clone()),
    workarounds: full.then(|| target.workarounds.clone()),
  }
}
