//! Immutable in-memory corpus index: O(1) id lookup and domain partitions.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use regex::Regex;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::fingerprint::{self, CorpusFingerprint};
use crate::matcher;
use crate::normalize;
use crate::types::{CanonId, DomainCount, ErrorCanon};

/// A compiled signature pattern.
///
/// Producers write Python-flavoured regexes. Most compile with `regex`; the
/// ones using look-around or backreferences fall back to `fancy_regex`.
#[derive(Debug, Clone)]
pub enum Pattern {
  Plain(Regex),
  Fancy(fancy_regex::Regex),
}

impl Pattern {
  pub fn compile(source: &str) -> Result<Self, String> {
    match Regex::new(source) {
      Ok(re) => Ok(Self::Plain(re)),
      Err(plain) => fancy_regex::Regex::new(source)
        .map(Self::Fancy)
        .map_err(|fancy| format!("{} ({})", fancy, plain)),
    }
  }

  /// Unanchored, case-sensitive test. A backtracking pattern that hits its
  /// step limit counts as no match.
  pub fn is_match(&self, text: &str) -> bool {
    match self {
      Self::Plain(re) => re.is_match(text),
      Self::Fancy(re) => re.is_match(text).unwrap_or_else(|e| {
        debug!(pattern = re.as_str(), error = %e, "pattern evaluation aborted");
        false
      }),
    }
  }
}

/// Domain names compare case-insensitively and ignore surrounding space.
pub fn domain_key(domain: &str) -> String {
  domain.trim().to_ascii_lowercase()
}

/// A validated canon with everything matching needs precomputed.
#[derive(Debug, Clone)]
pub struct IndexedCanon {
  pub canon: ErrorCanon,
  pub key: CanonId,
  /// Primary regex followed by the alternates.
  pub patterns: Vec<Pattern>,
  /// Fuzzy-pass tokens of the signature text and domain name.
  pub tokens: BTreeSet<String>,
}

/// Read-only after `load`. Share it behind an `Arc`; a reload builds a new store.
#[derive(Debug)]
pub struct CorpusStore {
  /// Sorted by (domain, slug, env).
  entries: Vec<IndexedCanon>,
  by_id: HashMap<String, usize>,
  /// Keyed by `domain_key`.
  by_domain: BTreeMap<String, Vec<usize>>,
  fingerprint: CorpusFingerprint,
}

impl CorpusStore {
  /// Validate, index and compile the whole corpus. Any integrity problem fails
  /// the load; nothing is partially built.
  pub fn load(entries: impl IntoIterator<Item = ErrorCanon>) -> Result<Self, EngineError> {
    let mut indexed: Vec<IndexedCanon> = Vec::new();
    let mut seen = HashSet::new();

    for raw in entries {
      let (canon, key) = normalize::validate(raw)?;
      if !seen.insert(canon.id.clone()) {
        return Err(EngineError::DuplicateId(canon.id));
      }
      let patterns = compile_patterns(&canon)?;
      let tokens = matcher::canon_tokens(&canon);
      indexed.push(IndexedCanon {
        canon,
        key,
        patterns,
        tokens,
      });
    }

    indexed.sort_by(|a, b| a.key.cmp(&b.key));

    let mut by_id = HashMap::with_capacity(indexed.len());
    let mut by_domain: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, entry) in indexed.iter().enumerate() {
      by_id.insert(entry.canon.id.clone(), i);
      by_domain.entry(domain_key(&entry.key.domain)).or_default().push(i);
    }

    let fingerprint = fingerprint::compute(indexed.iter().map(|e| &e.canon));

    info!(
      canons = indexed.len(),
      domains = by_domain.len(),
      fingerprint = fingerprint.as_str(),
      "corpus loaded"
    );

    Ok(Self {
      entries: indexed,
      by_id,
      by_domain,
      fingerprint,
    })
  }

  pub fn get(&self, id: &str) -> Option<&ErrorCanon> {
    self.entry(id).map(|e| &e.canon)
  }

  pub fn entry(&self, id: &str) -> Option<&IndexedCanon> {
    self.by_id.get(id).map(|&i| &self.entries[i])
  }

  /// Canons of one domain ordered by slug, then env. Empty for an unknown
  /// domain. The name is matched through `domain_key`.
  pub fn by_domain(&self, domain: &str) -> Vec<&ErrorCanon> {
    self.domain_entries(domain).into_iter().map(|e| &e.canon).collect()
  }

  pub fn domain_entries(&self, domain: &str) -> Vec<&IndexedCanon> {
    self
      .by_domain
      .get(&domain_key(domain))
      .map(|idx| idx.iter().map(|&i| &self.entries[i]).collect())
      .unwrap_or_default()
  }

  /// Every entry in store order.
  pub fn entries(&self) -> impl Iterator<Item = &IndexedCanon> {
    self.entries.iter()
  }

  /// Domains with their canon counts, ordered by domain name.
  pub fn all_domains(&self) -> Vec<DomainCount> {
    self
      .by_domain
      .iter()
      .map(|(domain, idx)| DomainCount {
        domain: domain.clone(),
        count: idx.len(),
      })
      .collect()
  }

  pub fn ids(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|e| e.canon.id.as_str())
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn fingerprint(&self) -> &CorpusFingerprint {
    &self.fingerprint
  }
}

fn compile_patterns(canon: &ErrorCanon) -> Result<Vec<Pattern>, EngineError> {
  canon
    .patterns()
    .map(|(field, source)| {
      Pattern::compile(source).map_err(|reason| EngineError::schema(&canon.id, &field, &reason))
    })
    .collect()
}
