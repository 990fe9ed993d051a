//! Read canon JSON produced by the authoring pipeline.

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::EngineError;
use crate::types::ErrorCanon;

/// Parse one JSON document holding either a single canon or an array of them.
///
/// Shape errors (missing required fields, wrong types, bad dates) become
/// `Schema` errors tagged with `origin`.
pub fn parse(json: &str, origin: &str) -> Result<Vec<ErrorCanon>, EngineError> {
  let trimmed = json.trim_start();
  let parsed = if trimmed.starts_with('[') {
    serde_json::from_str::<Vec<ErrorCanon>>(trimmed)
  } else {
    serde_json::from_str::<ErrorCanon>(trimmed).map(|c| vec![c])
  };
  parsed.map_err(|e| EngineError::schema(origin, "<document>", &e.to_string()))
}

/// Collect every `*.json` file under `dir`, in sorted path order.
pub fn read_dir(dir: impl AsRef<Path>) -> Result<Vec<ErrorCanon>, EngineError> {
  let dir = dir.as_ref();
  let mut canons = Vec::new();

  for entry in WalkDir::new(dir).sort_by_file_name() {
    let entry = entry.map_err(|e| {
      let path = e
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| dir.display().to_string());
      EngineError::io(path, e.into())
    })?;
    let path = entry.path();
    if !entry.file_type().is_file() || path.extension().and_then(|x| x.to_str()) != Some("json") {
      continue;
    }
    let origin = path.display().to_string();
    let body = fs::read_to_string(path).map_err(|e| EngineError::io(origin.clone(), e))?;
    let parsed = parse(&body, &origin)?;
    debug!(file = %origin, canons = parsed.len(), "read canon file");
    canons.extend(parsed);
  }

  Ok(canons)
}
