//! Binary entrypoint: load the corpus, then read JSON lines from stdin and
//! write JSON lines to stdout.
//!
//! Each input line is a Request (`{"op": "lookup_error", "text": "..."}`).
//! Each output line is either the operation's result or an ErrorOutput.
//! Logs go to stderr; set RUST_LOG to change the level.

use lookup_engine::types::ErrorOutput;
use lookup_engine::{Config, Engine, EngineError, Request};
use std::io::{self, BufRead, Write};
use tracing::{error, info};

const DEFAULT_CANON_DIR: &str = "data/canons";

fn main() {
  init_logging();

  let dir = std::env::var("DEADEND_CANON_DIR").unwrap_or_else(|_| DEFAULT_CANON_DIR.to_string());

  // The corpus must be fully loaded before the first request is read.
  let engine = match Engine::from_dir(&dir, Config::default()) {
    Ok(e) => e,
    Err(e) => {
      error!(dir = %dir, error = %e, "corpus load failed");
      std::process::exit(1);
    }
  };
  info!(
    dir = %dir,
    canons = engine.store().len(),
    fuzzy_threshold = engine.config().fuzzy_threshold,
    "ready"
  );

  let stdin = io::stdin();
  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  for line in stdin.lock().lines() {
    let line = match line {
      Ok(l) => l,
      Err(e) => {
        error!(error = %e, "read error");
        std::process::exit(1);
      }
    };

    // Skip blank lines.
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }

    let request: Request = match serde_json::from_str(trimmed) {
      Ok(v) => v,
      Err(e) => {
        let err = ErrorOutput::new(format!("json parse: {}", e));
        let _ = serde_json::to_writer(&mut out, &err);
        let _ = writeln!(out);
        continue;
      }
    };

    match engine.handle(&request) {
      Ok(value) => {
        let _ = serde_json::to_writer(&mut out, &value);
        let _ = writeln!(out);
      }
      Err(e) => {
        let err = match &e {
          EngineError::BatchTooLarge { .. } => ErrorOutput::new(e.to_string()).with_field("texts"),
          EngineError::EmptyQuery => ErrorOutput::new(e.to_string()).with_field("text"),
          EngineError::NotFound { suggestions, .. } => {
            ErrorOutput::new(e.to_string()).with_suggestions(suggestions.clone())
          }
          _ => ErrorOutput::new(e.to_string()),
        };
        let _ = serde_json::to_writer(&mut out, &err);
        let _ = writeln!(out);
      }
    }
    let _ = out.flush();
  }

  let _ = out.flush();
}

fn init_logging() {
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .with_target(false)
    .compact()
    .init();
}
