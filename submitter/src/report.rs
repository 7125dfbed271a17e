use bundle::document::{BatchFailure, FailureReport, FailureSummary, RetryPayload};
use bundle::model::{Row, SubmissionConfig};

/// Aggregated outcome of one submission run
#[derive(Debug, Default)]
pub struct SubmissionReport {
    pub success_records: Vec<Row>,
    pub failed_records: Vec<Row>,
    pub batch_errors: Vec<BatchFailure>,

    /// Record count of each planned batch, in submission order. This is the
    /// full output of a dry run.
    pub planned_batches: Vec<usize>,
}

impl SubmissionReport {
    /// True when the run classified no records either way (empty input or
    /// dry run)
    pub fn is_empty(&self) -> bool {
        self.success_records.is_empty() && self.failed_records.is_empty()
    }

    /// Builds the failure artifact, or `None` when nothing failed
    pub fn failure_report(&self, target_url: &str, timestamp: &str) -> Option<FailureReport> {
        if self.failed_records.is_empty() {
            return None;
        }

        Some(FailureReport {
            summary: FailureSummary {
                total_failed: self.failed_records.len(),
                failed_batches: self.batch_errors.len(),
                target_url: target_url.to_string(),
                timestamp: timestamp.to_string(),
            },
            batch_errors: self.batch_errors.clone(),
            failed_records: self.failed_records.clone(),
        })
    }

    /// Builds a directly re-submittable document holding exactly the failed
    /// records, or `None` when nothing failed. The embedded submission
    /// config is carried over verbatim so the payload needs no editing.
    pub fn retry_payload(&self, submission: &SubmissionConfig) -> Option<RetryPayload> {
        if self.failed_records.is_empty() {
            return None;
        }

        Some(RetryPayload {
            submission: submission.clone(),
            data: self.failed_records.clone(),
        })
    }
}
