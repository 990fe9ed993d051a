//! Stable fingerprint identifying one loaded corpus snapshot.

use serde::Serialize;

use crate::types::ErrorCanon;

/// A stable hex string identifying a corpus snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CorpusFingerprint(pub String);

impl CorpusFingerprint {
  pub fn as_str(&self) -> &str {
    &self.0
  }
}

/// Compute a fingerprint over canons that are already in store order.
///
/// Key components: each id plus its canonical JSON encoding, so any edit to
/// any field of any canon changes the result. Uses blake3 for a fast,
/// deterministic hash.
pub fn compute<'a>(canons: impl IntoIterator<Item = &'a ErrorCanon>) -> CorpusFingerprint {
  let mut hasher = blake3::Hasher::new();
  for canon in canons {
    hasher.update(canon.id.as_bytes());
    hasher.update(b"|");
    // Serializing plain data with string keys cannot fail; fall back to the id alone.
    let body = serde_json::to_vec(canon).unwrap_or_default();
    hasher.update(&body);
    hasher.update(b"\n");
  }

  let hash = hasher.finalize();
  // Use first 16 bytes (32 hex chars) for a compact but collision-resistant ID.
  let hex = hash.to_hex();
  CorpusFingerprint(hex[..32].to_string())
}
