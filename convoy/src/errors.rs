use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Bundle(#[from] bundle::BundleError),

    #[error(transparent)]
    Validation(#[from] bundle::ValidationError),

    #[error(transparent)]
    Submit(#[from] submitter::SubmitError),

    #[error("could not write artifact: {0}")]
    Io(#[from] std::io::Error),
}
