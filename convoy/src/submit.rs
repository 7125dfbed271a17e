use crate::artifacts;
use crate::errors::CliError;
use bundle::document::EnrichedDocument;
use std::path::Path;
use submitter::{SubmitOptions, SubmitOverrides, Submitter};

pub async fn run(input: &Path, overrides: SubmitOverrides) -> Result<(), CliError> {
    let document = EnrichedDocument::from_file(input)?;
    let opts = SubmitOptions::resolve(&document.submission, &overrides)?;

    tracing::info!(
        path = %input.display(),
        records = document.data.len(),
        url = %opts.target_url,
        method = %opts.method,
        batch_size = opts.batch_size,
        "loaded submission input"
    );

    let report = Submitter::new().submit(&document.data, &opts).await?;

    if opts.dry_run {
        for (index, size) in report.planned_batches.iter().enumerate() {
            tracing::info!(batch = index + 1, records = size, "planned batch");
        }
        tracing::info!(
            batches = report.planned_batches.len(),
            records = document.data.len(),
            "dry run complete, no data was sent"
        );
        return Ok(());
    }

    tracing::info!(
        succeeded = report.success_records.len(),
        failed = report.failed_records.len(),
        "submission complete"
    );

    artifacts::write_all(input, &document.submission, &opts, &report)?;
    Ok(())
}
