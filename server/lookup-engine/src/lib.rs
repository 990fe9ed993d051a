//! Error Canon Lookup Engine: deterministic matching over known error signatures.
//!
//! Loads a corpus of canonical error entries once, then answers queries:
//! exact-regex matching with a token-overlap fuzzy fallback, deterministic
//! ranking, depth-1 transition-graph expansion, keyword search and
//! per-domain listings and statistics.
//!
//! No DB, no network; pure computation over an immutable in-memory snapshot.

pub mod config;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod matcher;
pub mod normalize;
pub mod rank;
pub mod stats;
pub mod store;
pub mod types;

pub use config::Config;
pub use engine::Engine;
pub use error::EngineError;
pub use graph::GraphDetail;
pub use store::CorpusStore;
pub use types::{ErrorCanon, LookupOutcome, Request, SortBy};
