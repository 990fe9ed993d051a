//! Signature matching: exact regex pass, then token-overlap fuzzy fallback.
//!
//! The fuzzy pass only runs when the exact pass finds nothing, so a fuzzy
//! candidate can never displace an exact one.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::Config;
use crate::store::{CorpusStore, IndexedCanon};
use crate::types::{Candidate, ErrorCanon, MatchKind};

/// Words that carry no signal in error text.
const STOPWORDS: &[&str] = &[
  "the", "a", "an", "is", "of", "in", "to", "for", "and", "or", "no", "not", "on", "at", "by",
  "it", "be", "as", "do", "if", "error", "failed", "exception", "cannot", "can", "could", "was",
  "were", "been", "being", "has", "have", "had", "with", "from", "this", "that", "when", "which",
  "while",
];

/// Candidates for one query plus whether the domain hint had to be dropped.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
  pub candidates: Vec<Candidate>,
  pub domain_hint_ignored: bool,
}

/// Run both passes for a raw query, honouring an optional domain hint.
///
/// A hint restricts the search to one domain. When that yields nothing and
/// `widen_domain_hint` is set, the search is repeated over every domain and
/// the result is flagged instead of coming back empty.
pub fn match_query(
  store: &CorpusStore,
  query: &str,
  domain_hint: Option<&str>,
  config: &Config,
) -> MatchSet {
  let hint = domain_hint.map(str::trim).filter(|h| !h.is_empty());

  let Some(hint) = hint else {
    let all: Vec<&IndexedCanon> = store.entries().collect();
    return MatchSet {
      candidates: run_passes(&all, query, config),
      domain_hint_ignored: false,
    };
  };

  let scoped = store.domain_entries(hint);
  let candidates = run_passes(&scoped, query, config);
  if !candidates.is_empty() || !config.widen_domain_hint {
    return MatchSet {
      candidates,
      domain_hint_ignored: false,
    };
  }

  let all: Vec<&IndexedCanon> = store.entries().collect();
  let candidates = run_passes(&all, query, config);
  let widened = !candidates.is_empty();
  if widened {
    debug!(hint = %hint, found = candidates.len(), "domain hint matched nothing, widened to all domains");
  }
  MatchSet {
    candidates,
    domain_hint_ignored: widened,
  }
}

/// Keyword search: the fuzzy pass alone, strictly filtered by domain.
pub fn search(
  store: &CorpusStore,
  keyword: &str,
  domain: Option<&str>,
  config: &Config,
) -> Vec<Candidate> {
  let entries: Vec<&IndexedCanon> = match domain {
    Some(d) => store.domain_entries(d),
    None => store.entries().collect(),
  };
  fuzzy_pass(&entries, keyword, config)
}

fn run_passes(entries: &[&IndexedCanon], query: &str, config: &Config) -> Vec<Candidate> {
  let exact = exact_pass(entries, query);
  if !exact.is_empty() {
    debug!(exact = exact.len(), "exact pass matched");
    return exact;
  }
  let fuzzy = fuzzy_pass(entries, query, config);
  debug!(fuzzy = fuzzy.len(), "fuzzy pass matched");
  fuzzy
}

/// Case-sensitive, unanchored test of every pattern of every canon. A query
/// that contains the signature text verbatim is also an exact hit.
pub fn exact_pass(entries: &[&IndexedCanon], query: &str) -> Vec<Candidate> {
  entries
    .iter()
    .filter(|e| {
      e.patterns.iter().any(|re| re.is_match(query))
        || query.contains(e.canon.signature.signature.as_str())
    })
    .map(|e| Candidate {
      canon_id: e.canon.id.clone(),
      confidence: 1.0,
      match_kind: MatchKind::Exact,
      fix_success_rate: e.canon.verdict.fix_success_rate,
    })
    .collect()
}

/// Token-overlap similarity against each canon; drops anything below the threshold.
pub fn fuzzy_pass(entries: &[&IndexedCanon], query: &str, config: &Config) -> Vec<Candidate> {
  let query_tokens = tokenize(query);
  if query_tokens.is_empty() {
    return Vec::new();
  }
  entries
    .iter()
    .filter_map(|e| {
      let sim = similarity(&query_tokens, &e.tokens, config);
      let confidence = (sim * 1000.0).round() / 1000.0;
      if confidence > 0.0 && confidence >= config.fuzzy_threshold {
        Some(Candidate {
          canon_id: e.canon.id.clone(),
          confidence,
          match_kind: MatchKind::Fuzzy,
          fix_success_rate: e.canon.verdict.fix_success_rate,
        })
      } else {
        None
      }
    })
    .collect()
}

/// Lowercase word tokens minus stop words. Any Unicode letter or digit, or
/// `_`, is a word character.
pub fn tokenize(text: &str) -> BTreeSet<String> {
  text
    .split(|c: char| !(c.is_alphanumeric() || c == '_'))
    .filter(|t| !t.is_empty())
    .map(str::to_lowercase)
    .filter(|t| !STOPWORDS.contains(&t.as_str()))
    .collect()
}

/// Fuzzy text of a canon: its signature plus its domain name.
pub fn canon_tokens(canon: &ErrorCanon) -> BTreeSet<String> {
  let mut tokens = tokenize(&canon.signature.signature);
  tokens.extend(tokenize(canon.domain()));
  tokens
}

/// Domains whose keywords appear in `query` (case-insensitive substring), in
/// `Config::domain_keywords` order.
pub fn suggest_domains(query: &str, config: &Config) -> Vec<String> {
  let text = query.to_lowercase();
  config
    .domain_keywords
    .iter()
    .filter(|(_, keywords)| keywords.iter().any(|k| text.contains(k.as_str())))
    .map(|(domain, _)| domain.clone())
    .collect()
}

/// Prefix-weighted Jaccard similarity in [0, 1].
///
/// Each query token earns 1.0 for an identical canon token, or
/// `prefix_credit` when one is a prefix of the other and both are at least
/// `prefix_min_len` long ("mem" / "memory"). The credit total stands in for
/// the intersection size: `credit / (|Q| + |C| - credit)`.
pub fn similarity(query: &BTreeSet<String>, canon: &BTreeSet<String>, config: &Config) -> f64 {
  if query.is_empty() || canon.is_empty() {
    return 0.0;
  }
  let credit: f64 = query
    .iter()
    .map(|q| {
      if canon.contains(q) {
        return 1.0;
      }
      let prefix_hit = q.len() >= config.prefix_min_len
        && canon.iter().any(|c| {
          c.len() >= config.prefix_min_len && (c.starts_with(q.as_str()) || q.starts_with(c.as_str()))
        });
      if prefix_hit {
        config.prefix_credit
      } else {
        0.0
      }
    })
    .sum();
  let union = query.len() as f64 + canon.len() as f64 - credit;
  if union <= 0.0 {
    return 0.0;
  }
  (credit / union).clamp(0.0, 1.0)
}
