//! Integration tests for the lookup engine.

use std::sync::Arc;

use lookup_engine::corpus;
use lookup_engine::types::*;
use lookup_engine::{Config, CorpusStore, Engine, EngineError, GraphDetail};
use serde_json::json;

const FIXTURE: &str = r#"[
  {
    "schema_version": "1.0.0",
    "id": "python/modulenotfounderror/py311-linux",
    "url": "https://deadends.dev/python/modulenotfounderror/py311-linux",
    "error": {
      "signature": "ModuleNotFoundError: No module named 'X'",
      "regex": "No module named '\\w+'",
      "domain": "python",
      "category": "import_error",
      "first_seen": "2023-02-01",
      "last_confirmed": "2025-06-01"
    },
    "environment": {"runtime": {"name": "cpython", "version_range": ">=3.11,<3.12"}, "os": "linux"},
    "verdict": {
      "resolvable": "true",
      "fix_success_rate": 0.88,
      "confidence": 0.9,
      "summary": "The package is missing from the interpreter that runs the code.",
      "last_updated": "2025-06-01"
    },
    "dead_ends": [
      {"action": "pip install X with the system pip", "why_fails": "installs into a different interpreter", "fail_rate": 0.7, "common_misconception": "pip and python always point at the same interpreter"}
    ],
    "workarounds": [
      {"action": "Install with the running interpreter", "success_rate": 0.92, "how": "python -m pip install X"},
      {"action": "Activate the project virtualenv", "success_rate": 0.85, "how": "source .venv/bin/activate"}
    ],
    "transition_graph": {
      "leads_to": [],
      "preceded_by": [{"error_id": "pip/externally-managed/py312-debian", "probability": 0.3}],
      "frequently_confused_with": [{"error_id": "python/importerror/py311-linux", "distinction": "ImportError means the module exists but a name inside it does not"}]
    }
  },
  {
    "id": "python/importerror/py311-linux",
    "error": {
      "signature": "ImportError: cannot import name 'X' from 'Y'",
      "regex": "cannot import name '\\w+' from",
      "domain": "python"
    },
    "verdict": {"resolvable": "partial", "fix_success_rate": 0.6, "confidence": 0.7, "summary": "Circular import or renamed symbol."},
    "dead_ends": [{"action": "Reinstall the package", "why_fails": "the symbol really is missing", "fail_rate": 0.8}],
    "workarounds": [{"action": "Break the circular import", "success_rate": 0.7}]
  },
  {
    "id": "cuda/oom/cuda12-linux",
    "error": {
      "signature": "CUDA error: out of memory",
      "regex": "CUDA error: out of memory",
      "alt_regexes": ["CUDA out of memory\\. Tried to allocate"],
      "domain": "cuda"
    },
    "verdict": {"resolvable": "partial", "fix_success_rate": 0.55, "confidence": 0.8, "summary": "The model does not fit in device memory."},
    "dead_ends": [{"action": "torch.cuda.empty_cache()", "why_fails": "cached blocks are not the problem", "fail_rate": 0.85}],
    "workarounds": [
      {"action": "Reduce batch size", "success_rate": 0.8},
      {"action": "Enable gradient checkpointing", "success_rate": 0.6}
    ]
  },
  {
    "id": "pip/externally-managed/py312-debian",
    "error": {
      "signature": "error: externally-managed-environment",
      "regex": "externally-managed-environment",
      "domain": "pip"
    },
    "verdict": {"resolvable": "true", "fix_success_rate": 0.95, "confidence": 0.9, "summary": "The distro owns the system interpreter."},
    "dead_ends": [{"action": "sudo pip install", "why_fails": "breaks the system package manager", "fail_rate": 0.6}],
    "workarounds": [{"action": "Use a virtualenv", "success_rate": 0.95, "how": "python3 -m venv .venv"}],
    "transition_graph": {
      "leads_to": [
        {"error_id": "python/modulenotfounderror/py311-linux", "probability": 0.4, "condition": "after creating a fresh venv"},
        {"error_id": "pip/ghost/nowhere"}
      ]
    }
  }
]"#;

fn docker_canon(i: usize, resolvable: &str) -> ErrorCanon {
  serde_json::from_value(json!({
    "id": format!("docker/failure-{}/linux", i),
    "error": {
      "signature": format!("Docker failure number {}", i),
      "regex": format!("Docker failure number {}\\b", i),
      "domain": "docker"
    },
    "verdict": {"resolvable": resolvable, "fix_success_rate": 0.7, "confidence": 0.8, "summary": "docker"},
    "dead_ends": [{"action": "restart", "why_fails": "state persists", "fail_rate": 0.9}]
  }))
  .unwrap()
}

fn fixture_canons() -> Vec<ErrorCanon> {
  let mut canons = corpus::parse(FIXTURE, "fixture").unwrap();
  for i in 0..10 {
    let resolvable = match i {
      0..=6 => "true",
      7 | 8 => "partial",
      _ => "false",
    };
    canons.push(docker_canon(i, resolvable));
  }
  canons
}

fn engine() -> Engine {
  Engine::load(fixture_canons(), Config::default()).unwrap()
}

fn expect_match(outcome: &LookupOutcome) -> &LookupMatch {
  outcome.as_match().expect("expected a match")
}

#[test]
fn module_not_found_matches_exactly_with_workarounds() {
  let e = engine();
  let out = e
    .lookup_error("ModuleNotFoundError: No module named 'torch'", None)
    .unwrap();
  let m = expect_match(&out);

  assert_eq!(m.canon.id, "python/modulenotfounderror/py311-linux");
  assert_eq!(m.match_kind, MatchKind::Exact);
  assert_eq!(m.confidence, 1.0);
  assert!(m.canon.workarounds.len() >= 2);
  assert!(!m.domain_hint_ignored);
  assert_eq!(m.corpus_fingerprint, e.store().fingerprint().0);

  // Graph context for the top match.
  assert_eq!(m.graph.preceded_by[0].id, "pip/externally-managed/py312-debian");
  assert_eq!(m.graph.frequently_confused_with[0].id, "python/importerror/py311-linux");
  assert!(m.graph.unresolved_refs.is_empty());
  assert!(m.warnings.is_empty());
}

#[test]
fn fuzzy_fallback_finds_cuda_oom() {
  let e = engine();
  let out = e.lookup_error("out of mem on the gpu", None).unwrap();
  let m = expect_match(&out);

  assert_eq!(m.canon.id, "cuda/oom/cuda12-linux");
  assert_eq!(m.match_kind, MatchKind::Fuzzy);
  assert!(m.confidence > e.config().fuzzy_threshold && m.confidence < 1.0);
}

#[test]
fn alternate_pattern_matches() {
  let e = engine();
  let out = e
    .lookup_error("torch.OutOfMemoryError: CUDA out of memory. Tried to allocate 2.00 GiB", None)
    .unwrap();
  let m = expect_match(&out);
  assert_eq!(m.canon.id, "cuda/oom/cuda12-linux");
  assert_eq!(m.match_kind, MatchKind::Exact);
}

#[test]
fn batch_of_unmatched_inputs_returns_no_match_in_order() {
  let e = engine();
  let items = e.batch_lookup(&["a", "b", "c"], None).unwrap();

  assert_eq!(items.len(), 3);
  let queries: Vec<_> = items.iter().map(|i| i.query.as_str()).collect();
  assert_eq!(queries, vec!["a", "b", "c"]);
  for (i, item) in items.iter().enumerate() {
    assert_eq!(item.index, i);
    assert_eq!(item.outcome, BatchOutcome::NoMatch);
  }
}

#[test]
fn batch_preserves_order_with_mixed_results() {
  let e = engine();
  let items = e
    .batch_lookup(
      &[
        "CUDA error: out of memory",
        "zzz",
        "No module named 'requests'",
      ],
      None,
    )
    .unwrap();
  match &items[0].outcome {
    BatchOutcome::Match(m) => assert_eq!(m.canon.id, "cuda/oom/cuda12-linux"),
    other => panic!("unexpected {:?}", other),
  }
  assert_eq!(items[1].outcome, BatchOutcome::NoMatch);
  match &items[2].outcome {
    BatchOutcome::Match(m) => assert_eq!(m.canon.id, "python/modulenotfounderror/py311-linux"),
    other => panic!("unexpected {:?}", other),
  }
}

#[test]
fn oversized_batch_is_rejected_before_processing() {
  let e = engine();
  let texts: Vec<String> = (0..11).map(|i| format!("Docker failure number {}", i % 10)).collect();
  let err = e.batch_lookup(&texts, None).unwrap_err();
  assert!(matches!(err, EngineError::BatchTooLarge { len: 11, max: 10 }));

  // Exactly at the limit is fine.
  assert_eq!(e.batch_lookup(&texts[..10], None).unwrap().len(), 10);
}

#[test]
fn domain_stats_for_docker() {
  let e = engine();
  let stats = e.get_domain_stats("docker").unwrap();
  assert_eq!(stats.count, 10);
  assert_eq!(stats.resolvable_fraction, 0.7);
  assert_eq!(stats.resolvable_breakdown.partial, 2);
  assert_eq!(stats.resolvable_breakdown.unresolvable, 1);
  assert_eq!(stats.confidence_breakdown.high, 10);
}

#[test]
fn list_error_domains_matches_corpus() {
  let e = engine();
  let listing = e.list_error_domains();
  let names: Vec<_> = listing.domains.iter().map(|d| d.domain.as_str()).collect();
  assert_eq!(names, vec!["cuda", "docker", "pip", "python"]);
  assert_eq!(listing.total, 14);
  assert_eq!(
    listing.domains.iter().map(|d| d.count).sum::<usize>(),
    listing.total
  );
  let python = listing.domains.iter().find(|d| d.domain == "python").unwrap();
  assert_eq!(python.count, 2);
}

#[test]
fn get_error_detail_round_trips_every_canon() {
  let canons = fixture_canons();
  let e = Engine::load(canons.clone(), Config::default()).unwrap();
  for canon in &canons {
    assert_eq!(&e.get_error_detail(&canon.id).unwrap(), canon);
  }
}

#[test]
fn dead_end_misconception_survives_detail() {
  let e = engine();
  let canon = e
    .get_error_detail("python/modulenotfounderror/py311-linux")
    .unwrap();
  assert_eq!(
    canon.dead_ends[0].common_misconception.as_deref(),
    Some("pip and python always point at the same interpreter")
  );
  let v = serde_json::to_value(&canon).unwrap();
  assert_eq!(
    v["dead_ends"][0]["common_misconception"],
    "pip and python always point at the same interpreter"
  );
}

#[test]
fn unknown_id_is_not_found_not_no_match() {
  let e = engine();
  let err = e.get_error_detail("python/segfault/py311-linux").unwrap_err();
  assert!(matches!(err, EngineError::NotFound { .. }));
}

#[test]
fn reproducing_a_signature_matches_that_canon_exactly() {
  let e = engine();
  for canon in fixture_canons() {
    let out = e.lookup_error(&canon.signature.signature, None).unwrap();
    let m = expect_match(&out);
    assert_eq!(m.canon.id, canon.id, "signature {:?}", canon.signature.signature);
    assert_eq!(m.match_kind, MatchKind::Exact);
    assert_eq!(m.confidence, 1.0);
  }
}

#[test]
fn repeated_queries_are_identical() {
  let e = engine();
  for query in ["No module named 'x'", "out of mem on the gpu", "docker failure"] {
    let a = serde_json::to_string(&e.lookup_error(query, None).unwrap()).unwrap();
    let b = serde_json::to_string(&e.lookup_error(query, None).unwrap()).unwrap();
    assert_eq!(a, b, "query {:?}", query);
  }
}

#[test]
fn separately_loaded_engines_agree() {
  let mut reversed = fixture_canons();
  reversed.reverse();
  let a = engine();
  let b = Engine::load(reversed, Config::default()).unwrap();
  let qa = serde_json::to_string(&a.lookup_error("No module named 'x'", None).unwrap()).unwrap();
  let qb = serde_json::to_string(&b.lookup_error("No module named 'x'", None).unwrap()).unwrap();
  assert_eq!(qa, qb);
}

#[test]
fn exact_results_never_follow_fuzzy_ones() {
  let e = engine();
  for query in [
    "No module named 'x'",
    "Docker failure number 3",
    "out of mem on the gpu",
    "docker failure",
  ] {
    if let Some(m) = e.lookup_error(query, None).unwrap().as_match() {
      let mut kinds = vec![m.match_kind];
      kinds.extend(m.alternatives.iter().map(|a| a.match_kind));
      let first_fuzzy = kinds.iter().position(|k| *k == MatchKind::Fuzzy);
      let last_exact = kinds.iter().rposition(|k| *k == MatchKind::Exact);
      if let (Some(f), Some(x)) = (first_fuzzy, last_exact) {
        assert!(x < f, "exact ranked below fuzzy for {:?}", query);
      }
    }
  }
}

#[test]
fn dangling_leads_to_is_a_warning() {
  let e = engine();
  let out = e
    .lookup_error("error: externally-managed-environment", None)
    .unwrap();
  let m = expect_match(&out);

  assert_eq!(m.canon.id, "pip/externally-managed/py312-debian");
  assert_eq!(m.graph.leads_to.len(), 1);
  assert_eq!(m.graph.leads_to[0].id, "python/modulenotfounderror/py311-linux");
  assert_eq!(m.graph.leads_to[0].condition.as_deref(), Some("after creating a fresh venv"));
  assert_eq!(m.graph.unresolved_refs.len(), 1);
  assert_eq!(m.graph.unresolved_refs[0].error_id, "pip/ghost/nowhere");
  assert_eq!(m.warnings.len(), 1);
  assert_eq!(m.warnings[0].edge, EdgeKind::LeadsTo);
}

#[test]
fn full_graph_detail_includes_neighbour_bodies() {
  let e = engine();
  let out = e
    .lookup_error_with_graph("error: externally-managed-environment", None, GraphDetail::Full)
    .unwrap();
  let m = expect_match(&out);
  let workarounds = m.graph.leads_to[0].workarounds.as_ref().unwrap();
  assert_eq!(workarounds.len(), 2);
}

#[test]
fn domain_hint_widens_when_empty() {
  let e = engine();
  let out = e
    .lookup_error("CUDA error: out of memory", Some("docker"))
    .unwrap();
  let m = expect_match(&out);
  assert!(m.domain_hint_ignored);
  assert_eq!(m.canon.id, "cuda/oom/cuda12-linux");

  let out = e
    .lookup_error("No module named 'x'", Some("python"))
    .unwrap();
  assert!(!expect_match(&out).domain_hint_ignored);
}

#[test]
fn no_match_reports_what_was_searched() {
  let e = engine();
  match e.lookup_error("cargo build: borrow of moved value", None).unwrap() {
    LookupOutcome::NoMatch {
      query,
      suggested_domains,
      searched,
    } => {
      assert_eq!(query, "cargo build: borrow of moved value");
      // "cargo build" also contains "go build".
      assert_eq!(suggested_domains, vec!["rust".to_string(), "go".to_string()]);
      assert_eq!(searched, SearchedScope { canons: 14, domains: 4 });
    }
    other => panic!("unexpected {:?}", other),
  }
}

#[test]
fn domain_names_are_case_insensitive() {
  let e = engine();
  match e.search_errors("module", Some("Python"), None).unwrap() {
    SearchOutcome::Hits { hits } => {
      assert_eq!(hits[0].canon.id, "python/modulenotfounderror/py311-linux")
    }
    other => panic!("unexpected {:?}", other),
  }
  let stats = e.get_domain_stats("Python").unwrap();
  assert_eq!(stats.domain, "python");
  assert_eq!(stats.count, 2);
  assert_eq!(e.list_errors_by_domain("DOCKER", SortBy::Name).len(), 10);
}

#[test]
fn python_style_lookahead_patterns_are_served() {
  let canon: ErrorCanon = serde_json::from_value(json!({
    "id": "python/modulenotfounderror/py312-linux",
    "error": {
      "signature": "ModuleNotFoundError: No module named 'X'",
      "regex": "No module named '(?!pip)\\w+'",
      "domain": "python"
    },
    "verdict": {"resolvable": "true", "fix_success_rate": 0.8, "confidence": 0.9, "summary": "s"}
  }))
  .unwrap();
  let e = Engine::load(vec![canon], Config::default()).unwrap();

  let hit = e.lookup_error("No module named 'torch'", None).unwrap();
  assert_eq!(expect_match(&hit).match_kind, MatchKind::Exact);
  let miss = e.lookup_error("No module named 'pip'", None).unwrap();
  assert!(miss.as_match().map_or(true, |m| m.match_kind == MatchKind::Fuzzy));
}

#[test]
fn search_ranks_partial_matches() {
  let e = engine();
  match e.search_errors("memory", None, Some(3)).unwrap() {
    SearchOutcome::Hits { hits } => {
      assert_eq!(hits[0].canon.id, "cuda/oom/cuda12-linux");
      assert_eq!(hits[0].match_kind, MatchKind::Fuzzy);
      assert!(hits.len() <= 3);
    }
    other => panic!("unexpected {:?}", other),
  }

  match e.search_errors("docker failure", Some("docker"), Some(4)).unwrap() {
    SearchOutcome::Hits { hits } => {
      assert_eq!(hits.len(), 4);
      // Equal similarity and fix rate: id order decides.
      assert_eq!(hits[0].canon.id, "docker/failure-0/linux");
      assert_eq!(hits[1].canon.id, "docker/failure-1/linux");
    }
    other => panic!("unexpected {:?}", other),
  }

  assert!(matches!(
    e.search_errors("memory", Some("docker"), None).unwrap(),
    SearchOutcome::NoMatch { .. }
  ));
}

#[test]
fn list_errors_by_domain_orders() {
  let e = engine();
  let by_confidence: Vec<_> = e
    .list_errors_by_domain("python", SortBy::Confidence)
    .into_iter()
    .map(|c| c.id)
    .collect();
  assert_eq!(
    by_confidence,
    vec![
      "python/modulenotfounderror/py311-linux",
      "python/importerror/py311-linux"
    ]
  );
  let by_name: Vec<_> = e
    .list_errors_by_domain("python", SortBy::Name)
    .into_iter()
    .map(|c| c.id)
    .collect();
  assert_eq!(
    by_name,
    vec![
      "python/importerror/py311-linux",
      "python/modulenotfounderror/py311-linux"
    ]
  );
}

#[test]
fn concurrent_readers_see_the_same_results() {
  let e = Arc::new(engine());
  let expected = serde_json::to_string(&e.lookup_error("No module named 'x'", None).unwrap()).unwrap();

  std::thread::scope(|s| {
    let handles: Vec<_> = (0..4)
      .map(|_| {
        let e = Arc::clone(&e);
        s.spawn(move || serde_json::to_string(&e.lookup_error("No module named 'x'", None).unwrap()).unwrap())
      })
      .collect();
    for h in handles {
      assert_eq!(h.join().unwrap(), expected);
    }
  });
}

#[test]
fn snapshots_coexist() {
  let full = engine();
  let small = Engine::new(
    Arc::new(CorpusStore::load(vec![docker_canon(0, "true")]).unwrap()),
    Config::default(),
  );
  assert_eq!(full.list_error_domains().total, 14);
  assert_eq!(small.list_error_domains().total, 1);
  assert_ne!(full.store().fingerprint(), small.store().fingerprint());
}

#[test]
fn duplicate_ids_fail_at_load() {
  let mut canons = fixture_canons();
  canons.push(docker_canon(3, "true"));
  let err = Engine::load(canons, Config::default()).unwrap_err();
  assert!(err.is_load_failure());
  assert!(matches!(err, EngineError::DuplicateId(ref id) if id == "docker/failure-3/linux"));
}

#[test]
fn missing_verdict_fails_at_parse() {
  let doc = r#"{"id": "go/nil-map/go1", "error": {"signature": "assignment to entry in nil map", "regex": "nil map", "domain": "go"}}"#;
  let err = corpus::parse(doc, "nil-map.json").unwrap_err();
  assert!(err.is_load_failure());
  assert!(err.to_string().contains("verdict"), "{}", err);
}

#[test]
fn loads_from_directory() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join("fixture.json"), FIXTURE).unwrap();
  let e = Engine::from_dir(dir.path(), Config::default()).unwrap();
  assert_eq!(e.list_error_domains().total, 4);
}

#[test]
fn stream_requests_round_trip_as_json() {
  let e = engine();
  let req: Request = serde_json::from_str(r#"{"op":"batch_lookup","texts":["a","CUDA error: out of memory"]}"#).unwrap();
  let v = e.handle(&req).unwrap();
  assert_eq!(v[0]["outcome"]["status"], "no_match");
  assert_eq!(v[1]["outcome"]["status"], "match");
  assert_eq!(v[1]["outcome"]["canon"]["id"], "cuda/oom/cuda12-linux");
  assert_eq!(v[1]["outcome"]["match_kind"], "exact");
}
