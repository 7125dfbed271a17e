use thiserror::Error;

/// Configuration errors that stop a submission run before any request is
/// made. Per-batch failures are never errors; they become failure records in
/// the report.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("no target URL configured; pass --url or set submission.target_url in the document")]
    MissingTargetUrl,

    #[error("invalid target URL: {0}")]
    InvalidTargetUrl(#[from] url::ParseError),

    #[error("batch size must be greater than 0")]
    InvalidBatchSize,
}
