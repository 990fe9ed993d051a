//! Core types for the lookup engine (corpus records, JSON contracts, results).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Corpus records (JSON contract: what the corpus producer supplies)
// ---------------------------------------------------------------------------

/// One canonical error entry. Unknown fields are silently ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorCanon {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub schema_version: Option<String>,
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
  #[serde(rename = "error")]
  pub signature: Signature,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub environment: Option<serde_json::Value>,
  pub verdict: Verdict,
  #[serde(default)]
  pub dead_ends: Vec<DeadEnd>,
  #[serde(default)]
  pub workarounds: Vec<Workaround>,
  #[serde(default)]
  pub transition_graph: TransitionGraph,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metadata: Option<serde_json::Value>,
}

impl ErrorCanon {
  pub fn domain(&self) -> &str {
    &self.signature.domain
  }

  /// Primary pattern followed by the alternates, in declaration order, each
  /// with the field name it came from.
  pub fn patterns(&self) -> impl Iterator<Item = (String, &str)> {
    std::iter::once(("error.regex".to_string(), self.signature.regex.as_str())).chain(
      self
        .signature
        .alt_regexes
        .iter()
        .enumerate()
        .map(|(i, p)| (format!("error.alt_regexes[{}]", i), p.as_str())),
    )
  }
}

/// Human-readable signature plus the patterns used to recognise raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
  pub signature: String,
  pub regex: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub alt_regexes: Vec<String>,
  pub domain: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub first_seen: Option<NaiveDate>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_confirmed: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
  pub resolvable: Resolvable,
  pub fix_success_rate: f64,
  /// Curator confidence in the verdict itself (not a match score).
  pub confidence: f64,
  pub summary: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_updated: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "ResolvableRepr")]
pub enum Resolvable {
  True,
  Partial,
  False,
}

impl Resolvable {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::True => "true",
      Self::Partial => "partial",
      Self::False => "false",
    }
  }
}

/// Producers write `"true"` / `"partial"` / `"false"`; bare JSON booleans are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResolvableRepr {
  Flag(bool),
  Text(String),
}

impl TryFrom<ResolvableRepr> for Resolvable {
  type Error = String;

  fn try_from(repr: ResolvableRepr) -> Result<Self, Self::Error> {
    match repr {
      ResolvableRepr::Flag(true) => Ok(Self::True),
      ResolvableRepr::Flag(false) => Ok(Self::False),
      ResolvableRepr::Text(s) => match s.to_ascii_lowercase().as_str() {
        "true" => Ok(Self::True),
        "partial" => Ok(Self::Partial),
        "false" => Ok(Self::False),
        other => Err(format!(
          "invalid resolvable {:?}: expected true|partial|false",
          other
        )),
      },
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadEnd {
  pub action: String,
  pub why_fails: String,
  pub fail_rate: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
  /// Why people keep trying this anyway.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub common_misconception: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workaround {
  pub action: String,
  pub success_rate: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub how: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tradeoff: Option<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub sources: Vec<String>,
}

/// Adjacency lists keyed by canon id. Edges are directional and may form cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionGraph {
  #[serde(default)]
  pub leads_to: Vec<TransitionEdge>,
  #[serde(default)]
  pub preceded_by: Vec<TransitionEdge>,
  #[serde(default)]
  pub frequently_confused_with: Vec<TransitionEdge>,
}

impl TransitionGraph {
  pub fn edges(&self, kind: EdgeKind) -> &[TransitionEdge] {
    match kind {
      EdgeKind::LeadsTo => &self.leads_to,
      EdgeKind::PrecededBy => &self.preceded_by,
      EdgeKind::FrequentlyConfusedWith => &self.frequently_confused_with,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEdge {
  pub error_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub probability: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub typical_delay: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub distinction: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
  LeadsTo,
  PrecededBy,
  FrequentlyConfusedWith,
}

impl EdgeKind {
  pub const ALL: [EdgeKind; 3] = [
    EdgeKind::LeadsTo,
    EdgeKind::PrecededBy,
    EdgeKind::FrequentlyConfusedWith,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::LeadsTo => "leads_to",
      Self::PrecededBy => "preceded_by",
      Self::FrequentlyConfusedWith => "frequently_confused_with",
    }
  }
}

// ---------------------------------------------------------------------------
// Canon id
// ---------------------------------------------------------------------------

/// Parsed `{domain}/{slug}/{env}` key. Field order gives the store's sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonId {
  pub domain: String,
  pub slug: String,
  pub env: String,
}

impl CanonId {
  /// Exactly three non-empty segments, no whitespace.
  pub fn parse(id: &str) -> Option<Self> {
    if id.chars().any(char::is_whitespace) {
      return None;
    }
    let mut parts = id.split('/');
    let domain = parts.next()?;
    let slug = parts.next()?;
    let env = parts.next()?;
    if parts.next().is_some() || domain.is_empty() || slug.is_empty() || env.is_empty() {
      return None;
    }
    Some(Self {
      domain: domain.to_string(),
      slug: slug.to_string(),
      env: env.to_string(),
    })
  }
}

impl fmt::Display for CanonId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}/{}", self.domain, self.slug, self.env)
  }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
  Exact,
  Fuzzy,
}

impl MatchKind {
  /// Higher sorts first.
  pub fn priority(self) -> u8 {
    match self {
      Self::Exact => 1,
      Self::Fuzzy => 0,
    }
  }
}

/// One scored candidate for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
  pub canon_id: String,
  pub confidence: f64,
  pub match_kind: MatchKind,
  pub fix_success_rate: f64,
}

// ---------------------------------------------------------------------------
// Output types (JSON contract: what the façade returns)
// ---------------------------------------------------------------------------

/// Compact view of a canon for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonSummary {
  pub id: String,
  pub domain: String,
  pub signature: String,
  pub resolvable: Resolvable,
  pub fix_success_rate: f64,
  pub verdict_confidence: f64,
  pub summary: String,
}

impl From<&ErrorCanon> for CanonSummary {
  fn from(canon: &ErrorCanon) -> Self {
    Self {
      id: canon.id.clone(),
      domain: canon.domain().to_string(),
      signature: canon.signature.signature.clone(),
      resolvable: canon.verdict.resolvable,
      fix_success_rate: canon.verdict.fix_success_rate,
      verdict_confidence: canon.verdict.confidence,
      summary: canon.verdict.summary.clone(),
    }
  }
}

/// A ranked candidate together with how it matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSummary {
  #[serde(flatten)]
  pub canon: CanonSummary,
  pub match_kind: MatchKind,
  pub confidence: f64,
}

/// A resolved transition-graph neighbour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiblingSummary {
  pub id: String,
  pub domain: String,
  pub signature: String,
  pub resolvable: Resolvable,
  pub fix_success_rate: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub probability: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub condition: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub distinction: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub dead_ends: Option<Vec<DeadEnd>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub workarounds: Option<Vec<Workaround>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedRef {
  pub edge: EdgeKind,
  pub error_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphExpansion {
  pub leads_to: Vec<SiblingSummary>,
  pub preceded_by: Vec<SiblingSummary>,
  pub frequently_confused_with: Vec<SiblingSummary>,
  pub unresolved_refs: Vec<UnresolvedRef>,
}

/// Non-fatal: a transition edge points at an id the corpus does not contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphResolutionWarning {
  pub canon_id: String,
  pub edge: EdgeKind,
  pub missing_id: String,
  pub message: String,
}

/// Best match in full, plus graph context and the runners-up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupMatch {
  pub query: String,
  pub match_kind: MatchKind,
  pub confidence: f64,
  pub canon: ErrorCanon,
  pub graph: GraphExpansion,
  pub alternatives: Vec<CandidateSummary>,
  pub domain_hint_ignored: bool,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<GraphResolutionWarning>,
  pub corpus_fingerprint: String,
}

/// How much of the corpus a lookup looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchedScope {
  pub canons: usize,
  pub domains: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
  Match(Box<LookupMatch>),
  /// Nothing cleared the threshold. `suggested_domains` are guesses from
  /// keywords in the query and may name domains the corpus lacks.
  NoMatch {
    query: String,
    suggested_domains: Vec<String>,
    searched: SearchedScope,
  },
}

impl LookupOutcome {
  pub fn as_match(&self) -> Option<&LookupMatch> {
    match self {
      Self::Match(m) => Some(m),
      Self::NoMatch { .. } => None,
    }
  }
}

/// Per-item batch result; each slot succeeds or fails on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
  Match(Box<LookupMatch>),
  NoMatch,
  Invalid { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
  pub index: usize,
  pub query: String,
  pub outcome: BatchOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
  Hits { hits: Vec<CandidateSummary> },
  NoMatch { keyword: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
  #[default]
  FixRate,
  Name,
  Confidence,
}

impl FromStr for SortBy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "fix_rate" | "fix_success_rate" => Ok(Self::FixRate),
      "name" => Ok(Self::Name),
      "confidence" => Ok(Self::Confidence),
      other => Err(format!(
        "invalid sort_by {:?}: expected fix_rate|name|confidence",
        other
      )),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
  pub domain: String,
  pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainListing {
  pub total: usize,
  pub domains: Vec<DomainCount>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolvableBreakdown {
  #[serde(rename = "true")]
  pub resolvable: usize,
  pub partial: usize,
  #[serde(rename = "false")]
  pub unresolvable: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfidenceBreakdown {
  pub high: usize,
  pub medium: usize,
  pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainStats {
  pub domain: String,
  pub count: usize,
  pub avg_fix_rate: f64,
  pub resolvable_fraction: f64,
  pub resolvable_breakdown: ResolvableBreakdown,
  pub confidence_breakdown: ConfidenceBreakdown,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// One request line on stdin, dispatched to the matching façade operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
  LookupError {
    text: String,
    #[serde(default)]
    domain_hint: Option<String>,
  },
  BatchLookup {
    texts: Vec<String>,
    #[serde(default)]
    max: Option<usize>,
  },
  SearchErrors {
    keyword: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
  },
  ListErrorsByDomain {
    domain: String,
    #[serde(default)]
    sort_by: SortBy,
  },
  GetDomainStats {
    domain: String,
  },
  GetErrorDetail {
    id: String,
  },
  ListErrorDomains,
}

/// Structured error output for failed request lines.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub field: Option<String>,
  #[serde(skip_serializing_if = "Vec::is_empty")]
  pub suggestions: Vec<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      field: None,
      suggestions: Vec::new(),
    }
  }

  pub fn with_field(mut self, field: impl Into<String>) -> Self {
    self.field = Some(field.into());
    self
  }

  pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
    self.suggestions = suggestions;
    self
  }
}
