//! Submission engine: partitions enriched records into fixed-size batches,
//! submits them sequentially to the destination endpoint, and partitions the
//! results into success/failure sets with a ready-to-retry payload.

pub mod batcher;
pub mod engine;
pub mod errors;
pub mod metrics_defs;
pub mod report;

pub use engine::{DEFAULT_BATCH_SIZE, SubmitOptions, SubmitOverrides, Submitter};
pub use errors::SubmitError;
pub use report::SubmissionReport;
