//! Enrichment engine: renders per-row API requests from declarative rules,
//! fans them out under a concurrency bound, and merges the extracted values
//! back into the rows.

pub mod engine;
pub mod metrics_defs;
pub mod path;
pub mod request;
pub mod template;

pub use engine::{DEFAULT_CONCURRENCY, Enricher, EnrichmentSummary};
