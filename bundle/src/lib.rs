pub mod document;
pub mod metrics_defs;
pub mod model;

pub use document::{read_json, write_json};
pub use model::{Bundle, EnrichmentRule, Row, SubmissionConfig, SubmitMethod, ValidationError};

#[derive(thiserror::Error, Debug)]
pub enum BundleError {
    #[error("could not load document from file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse document: {0}")]
    Json(#[from] serde_json::Error),
}
