//! Query façade: the public operations, composed from matcher, ranker and graph.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::corpus;
use crate::error::EngineError;
use crate::graph::{self, GraphDetail};
use crate::matcher;
use crate::normalize::clamp_unit;
use crate::rank;
use crate::stats;
use crate::store::{domain_key, CorpusStore};
use crate::types::*;

/// The lookup engine. Holds an immutable corpus snapshot; every operation
/// takes `&self`, so one engine can be shared across threads behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Engine {
  config: Config,
  store: Arc<CorpusStore>,
}

impl Engine {
  pub fn new(store: Arc<CorpusStore>, config: Config) -> Self {
    Self { config, store }
  }

  pub fn with_defaults(store: Arc<CorpusStore>) -> Self {
    Self::new(store, Config::default())
  }

  /// Build the store from canons and wrap it. Load failures are returned
  /// here, before any query can run.
  pub fn load(canons: Vec<ErrorCanon>, config: Config) -> Result<Self, EngineError> {
    let store = CorpusStore::load(canons)?;
    Ok(Self::new(Arc::new(store), config))
  }

  /// Load every `*.json` canon under `dir`.
  pub fn from_dir(dir: impl AsRef<Path>, config: Config) -> Result<Self, EngineError> {
    Self::load(corpus::read_dir(dir)?, config)
  }

  pub fn store(&self) -> &Arc<CorpusStore> {
    &self.store
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Best match for a raw error message, with graph context for it.
  ///
  /// Returns `Ok(NoMatch)` when nothing clears the threshold and
  /// `Err(EmptyQuery)` for blank input.
  pub fn lookup_error(
    &self,
    text: &str,
    domain_hint: Option<&str>,
  ) -> Result<LookupOutcome, EngineError> {
    self.lookup_error_with_graph(text, domain_hint, GraphDetail::Summary)
  }

  /// Like `lookup_error`, choosing how much of each graph neighbour to include.
  pub fn lookup_error_with_graph(
    &self,
    text: &str,
    domain_hint: Option<&str>,
    detail: GraphDetail,
  ) -> Result<LookupOutcome, EngineError> {
    if text.trim().is_empty() {
      return Err(EngineError::EmptyQuery);
    }

    let set = matcher::match_query(&self.store, text, domain_hint, &self.config);
    let ranked = rank::rank(set.candidates, self.config.max_results.max(1));

    let Some(best) = ranked.first() else {
      let suggested_domains = matcher::suggest_domains(text, &self.config);
      debug!(query_len = text.len(), suggested = ?suggested_domains, "no match");
      return Ok(LookupOutcome::NoMatch {
        query: text.to_string(),
        suggested_domains,
        searched: SearchedScope {
          canons: self.store.len(),
          domains: self.store.all_domains().len(),
        },
      });
    };
    let canon = self.store.get(&best.canon_id).ok_or_else(|| EngineError::NotFound {
      id: best.canon_id.clone(),
      suggestions: Vec::new(),
    })?;

    let graph = graph::expand(&self.store, canon, detail);
    let warnings = graph::warnings(&canon.id, &graph);
    let alternatives = ranked[1..]
      .iter()
      .filter_map(|c| self.candidate_summary(c))
      .collect();

    debug!(
      best = %canon.id,
      kind = ?best.match_kind,
      confidence = best.confidence,
      candidates = ranked.len(),
      "lookup matched"
    );

    Ok(LookupOutcome::Match(Box::new(LookupMatch {
      query: text.to_string(),
      match_kind: best.match_kind,
      confidence: best.confidence,
      canon: canon.clone(),
      graph,
      alternatives,
      domain_hint_ignored: set.domain_hint_ignored,
      warnings,
      corpus_fingerprint: self.store.fingerprint().0.clone(),
    })))
  }

  /// Look up several messages independently, results in input order.
  ///
  /// More than `max` inputs (default `Config::batch_max`) is rejected before
  /// any item is processed. A failing item only affects its own slot.
  pub fn batch_lookup<S: AsRef<str>>(
    &self,
    texts: &[S],
    max: Option<usize>,
  ) -> Result<Vec<BatchItem>, EngineError> {
    let max = max.unwrap_or(self.config.batch_max);
    if texts.len() > max {
      return Err(EngineError::BatchTooLarge {
        len: texts.len(),
        max,
      });
    }

    Ok(
      texts
        .iter()
        .enumerate()
        .map(|(index, text)| {
          let query = text.as_ref();
          let outcome = match self.lookup_error(query, None) {
            Ok(LookupOutcome::Match(m)) => BatchOutcome::Match(m),
            Ok(LookupOutcome::NoMatch { .. }) => BatchOutcome::NoMatch,
            Err(e) => BatchOutcome::Invalid {
              reason: e.to_string(),
            },
          };
          BatchItem {
            index,
            query: query.to_string(),
            outcome,
          }
        })
        .collect(),
    )
  }

  /// Keyword search over signatures using the fuzzy pass only.
  pub fn search_errors(
    &self,
    keyword: &str,
    domain: Option<&str>,
    limit: Option<usize>,
  ) -> Result<SearchOutcome, EngineError> {
    if keyword.trim().is_empty() {
      return Err(EngineError::EmptyQuery);
    }
    let candidates = matcher::search(&self.store, keyword, domain, &self.config);
    let ranked = rank::rank(candidates, limit.unwrap_or(self.config.search_limit));
    if ranked.is_empty() {
      return Ok(SearchOutcome::NoMatch {
        keyword: keyword.to_string(),
      });
    }
    let hits = ranked
      .iter()
      .filter_map(|c| self.candidate_summary(c))
      .collect();
    Ok(SearchOutcome::Hits { hits })
  }

  /// Canons of one domain in the requested order. Empty for an unknown domain.
  pub fn list_errors_by_domain(&self, domain: &str, sort_by: SortBy) -> Vec<CanonSummary> {
    let mut canons = self.store.by_domain(domain);
    match sort_by {
      // Store order is already slug, then env.
      SortBy::Name => {}
      SortBy::FixRate => canons.sort_by(|a, b| {
        clamp_unit(b.verdict.fix_success_rate)
          .total_cmp(&clamp_unit(a.verdict.fix_success_rate))
          .then_with(|| a.id.cmp(&b.id))
      }),
      SortBy::Confidence => canons.sort_by(|a, b| {
        clamp_unit(b.verdict.confidence)
          .total_cmp(&clamp_unit(a.verdict.confidence))
          .then_with(|| a.id.cmp(&b.id))
      }),
    }
    canons.into_iter().map(CanonSummary::from).collect()
  }

  pub fn get_domain_stats(&self, domain: &str) -> Result<DomainStats, EngineError> {
    let canons = self.store.by_domain(domain);
    stats::domain_stats(&domain_key(domain), &canons, &self.config)
      .ok_or_else(|| EngineError::UnknownDomain(domain.to_string()))
  }

  /// The canon exactly as loaded, or `NotFound` with up to five similar ids.
  pub fn get_error_detail(&self, id: &str) -> Result<ErrorCanon, EngineError> {
    self
      .store
      .get(id)
      .cloned()
      .ok_or_else(|| EngineError::NotFound {
        id: id.to_string(),
        suggestions: self.suggest_ids(id),
      })
  }

  pub fn list_error_domains(&self) -> DomainListing {
    DomainListing {
      total: self.store.len(),
      domains: self.store.all_domains(),
    }
  }

  /// Dispatch one stream request to its operation and encode the result.
  pub fn handle(&self, request: &Request) -> Result<serde_json::Value, EngineError> {
    let value = match request {
      Request::LookupError { text, domain_hint } => {
        serde_json::to_value(self.lookup_error(text, domain_hint.as_deref())?)?
      }
      Request::BatchLookup { texts, max } => serde_json::to_value(self.batch_lookup(texts.as_slice(), *max)?)?,
      Request::SearchErrors {
        keyword,
        domain,
        limit,
      } => serde_json::to_value(self.search_errors(keyword, domain.as_deref(), *limit)?)?,
      Request::ListErrorsByDomain { domain, sort_by } => {
        serde_json::to_value(self.list_errors_by_domain(domain, *sort_by))?
      }
      Request::GetDomainStats { domain } => serde_json::to_value(self.get_domain_stats(domain)?)?,
      Request::GetErrorDetail { id } => serde_json::to_value(self.get_error_detail(id)?)?,
      Request::ListErrorDomains => serde_json::to_value(self.list_error_domains())?,
    };
    Ok(value)
  }

  fn candidate_summary(&self, candidate: &Candidate) -> Option<CandidateSummary> {
    self.store.get(&candidate.canon_id).map(|canon| CandidateSummary {
      canon: CanonSummary::from(canon),
      match_kind: candidate.match_kind,
      confidence: candidate.confidence,
    })
  }

  fn suggest_ids(&self, id: &str) -> Vec<String> {
    let needle = id.trim();
    if needle.is_empty() {
      return Vec::new();
    }
    self
      .store
      .ids()
      .filter(|candidate| candidate.contains(needle) || needle.contains(candidate))
      .take(5)
      .map(str::to_string)
      .collect()
  }
}
