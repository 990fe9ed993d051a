//! Engine configuration with sane defaults.

/// Tunable thresholds for matching, ranking and reporting.
#[derive(Debug, Clone)]
pub struct Config {
  /// Minimum fuzzy similarity (0..1) for a candidate to be kept.
  pub fuzzy_threshold: f64,
  /// Credit (0..1) for a token that is a prefix of the other, e.g. "mem" / "memory".
  pub prefix_credit: f64,
  /// Shortest token eligible for prefix credit.
  pub prefix_min_len: usize,
  /// Default number of ranked candidates returned by a lookup.
  pub max_results: usize,
  /// Default number of hits returned by keyword search.
  pub search_limit: usize,
  /// Default maximum number of inputs accepted by a batch lookup.
  pub batch_max: usize,
  /// Retry over all domains when a domain hint produces nothing.
  pub widen_domain_hint: bool,
  /// Verdict confidence at or above this counts as "high" in domain stats.
  pub high_confidence: f64,
  /// Verdict confidence at or above this (and below high) counts as "medium".
  pub medium_confidence: f64,
  /// Lowercase keywords per domain, used to suggest domains when a lookup
  /// finds nothing.
  pub domain_keywords: Vec<(String, Vec<String>)>,
}

const DOMAIN_KEYWORDS: &[(&str, &[&str])] = &[
  ("python", &["python", "pip", "import", "module", "traceback", "def "]),
  ("node", &["node", "npm", "require", "module.exports", "package.json"]),
  ("docker", &["docker", "container", "image", "dockerfile", "daemon"]),
  ("git", &["git", "commit", "push", "merge", "branch", "repository"]),
  ("cuda", &["cuda", "gpu", "nvidia", "torch", "tensor", "nccl"]),
  ("typescript", &["typescript", "ts2", "ts7", "tsconfig", ".ts "]),
  ("rust", &["rust", "cargo", "borrow", "lifetime", "e0"]),
  ("go", &["go ", "golang", "goroutine", "go.mod", "go build"]),
  ("kubernetes", &["kubernetes", "k8s", "kubectl", "pod", "deploy"]),
  ("terraform", &["terraform", "tf ", "state", "provider", "hcl"]),
  ("aws", &["aws", "s3", "ec2", "iam", "lambda", "cloudformation"]),
  ("nextjs", &["next.js", "nextjs", "next/", "getserverside", "getstaticprops"]),
  ("react", &["react", "usestate", "useeffect", "jsx", "component"]),
  ("pip", &["pip install", "pip3", "pypi", "wheel", "sdist"]),
];

impl Default for Config {
  fn default() -> Self {
    Self {
      fuzzy_threshold: 0.15,
      prefix_credit: 0.5,
      prefix_min_len: 3,
      max_results: 5,
      search_limit: 10,
      batch_max: 10,
      widen_domain_hint: true,
      high_confidence: 0.8,
      medium_confidence: 0.5,
      domain_keywords: DOMAIN_KEYWORDS
        .iter()
        .map(|(domain, words)| {
          (
            domain.to_string(),
            words.iter().map(|w| w.to_string()).collect(),
          )
        })
        .collect(),
    }
  }
}
