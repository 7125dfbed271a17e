//! Output artifacts written next to the submission input: a flat success
//! log, a failure report with per-batch detail, and a retry payload that
//! feeds straight back into `convoy submit`. Each file is written only when
//! it has content.

use crate::errors::CliError;
use bundle::model::SubmissionConfig;
use bundle::write_json;
use std::path::{Path, PathBuf};
use submitter::{SubmitOptions, SubmissionReport};

pub fn write_all(
    input: &Path,
    submission: &SubmissionConfig,
    opts: &SubmitOptions,
    report: &SubmissionReport,
) -> Result<(), CliError> {
    if report.is_empty() {
        tracing::info!("no records were submitted, no artifacts to write");
        return Ok(());
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

    if !report.success_records.is_empty() {
        let path = artifact_path(input, "success", &timestamp);
        write_json(&path, &report.success_records).map_err(io_error)?;
        tracing::info!(
            path = %path.display(),
            records = report.success_records.len(),
            "success log written"
        );
    }

    if let Some(failure) = report.failure_report(opts.target_url.as_str(), &timestamp) {
        let path = artifact_path(input, "failed", &timestamp);
        write_json(&path, &failure).map_err(io_error)?;
        tracing::info!(
            path = %path.display(),
            records = failure.summary.total_failed,
            batches = failure.summary.failed_batches,
            "failure log written"
        );
    }

    // Written alongside the failure log; the embedded submission config is
    // carried over so the file resubmits without edits.
    if let Some(retry) = report.retry_payload(submission) {
        let path = artifact_path(input, "retry", &timestamp);
        write_json(&path, &retry).map_err(io_error)?;
        tracing::info!(
            path = %path.display(),
            "retry payload written, resubmit it with `convoy submit`"
        );
    }

    Ok(())
}

fn io_error(e: bundle::BundleError) -> CliError {
    match e {
        bundle::BundleError::Io(io) => CliError::Io(io),
        other => CliError::Bundle(other),
    }
}

/// `data.json` + "failed" + ts becomes `data_failed_<ts>.json`
fn artifact_path(input: &Path, kind: &str, timestamp: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}_{kind}_{timestamp}.json"))
}
