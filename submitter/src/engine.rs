//! Sequential batch submission.
//!
//! Batches go out one at a time, in order; destination-side ordering is part
//! of the contract, so there is deliberately no concurrency here. The failure
//! unit is the whole batch: one rejected request marks every record in that
//! batch failed, and processing continues with the next batch.

use crate::batcher::batch;
use crate::errors::SubmitError;
use crate::metrics_defs::{BATCHES_FAILED, BATCHES_SUBMITTED, RECORDS_FAILED, RECORDS_SUCCEEDED};
use crate::report::SubmissionReport;
use bundle::counter;
use bundle::document::BatchFailure;
use bundle::model::{Row, SubmissionConfig, SubmitMethod};
use url::Url;

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Response and error text stored in the failure artifact is cut to this
/// many characters
const RESPONSE_SNIPPET_LEN: usize = 500;

/// Caller-supplied overrides for the document-embedded submission config
#[derive(Debug, Default)]
pub struct SubmitOverrides {
    pub target_url: Option<String>,
    pub method: Option<SubmitMethod>,
    pub batch_size: Option<usize>,
    pub dry_run: bool,
}

/// Effective submission settings after merging overrides with the embedded
/// config
#[derive(Debug)]
pub struct SubmitOptions {
    pub target_url: Url,
    pub method: SubmitMethod,
    pub batch_size: usize,
    pub dry_run: bool,
}

impl SubmitOptions {
    /// Resolves effective settings; overrides win over the embedded config.
    /// A missing or empty target URL and a zero batch size are configuration
    /// errors surfaced before any request is made.
    pub fn resolve(
        config: &SubmissionConfig,
        overrides: &SubmitOverrides,
    ) -> Result<Self, SubmitError> {
        let target_url = overrides
            .target_url
            .clone()
            .or_else(|| config.target_url.clone())
            .filter(|url| !url.is_empty())
            .ok_or(SubmitError::MissingTargetUrl)?;

        let batch_size = overrides
            .batch_size
            .or(config.batch_size.map(|n| n as usize))
            .unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(SubmitError::InvalidBatchSize);
        }

        Ok(Self {
            target_url: Url::parse(&target_url)?,
            method: overrides.method.or(config.method).unwrap_or(SubmitMethod::Post),
            batch_size,
            dry_run: overrides.dry_run,
        })
    }
}

/// Why one batch was classified failed
struct BatchRejection {
    /// HTTP status, 0 for transport-level failures
    status: u16,
    response: String,
}

pub struct Submitter {
    client: reqwest::Client,
}

impl Default for Submitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Submitter {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Submits records in fixed-size batches and classifies every record as
    /// success or failed. Zero records is an empty report, not an error.
    pub async fn submit(
        &self,
        records: &[Row],
        opts: &SubmitOptions,
    ) -> Result<SubmissionReport, SubmitError> {
        let batches = batch(records, opts.batch_size)?;
        let mut report = SubmissionReport {
            planned_batches: batches.iter().map(|b| b.len()).collect(),
            ..Default::default()
        };

        if opts.dry_run {
            tracing::info!(
                records = records.len(),
                batches = batches.len(),
                "dry run, nothing will be sent"
            );
            return Ok(report);
        }

        if records.is_empty() {
            tracing::info!("no records to submit");
            return Ok(report);
        }

        let total_batches = batches.len();
        tracing::info!(
            records = records.len(),
            total_batches,
            batch_size = opts.batch_size,
            url = %opts.target_url,
            method = %opts.method,
            "submitting batches sequentially"
        );

        for (index, records) in batches.iter().enumerate() {
            let batch_index = index + 1;
            counter!(BATCHES_SUBMITTED).increment(1);

            match self.submit_batch(records, opts).await {
                Ok(status) => {
                    tracing::info!(
                        batch = batch_index,
                        total_batches,
                        status,
                        records = records.len(),
                        "batch accepted"
                    );
                    counter!(RECORDS_SUCCEEDED).increment(records.len() as u64);
                    report.success_records.extend(records.iter().cloned());
                }
                Err(rejection) => {
                    tracing::warn!(
                        batch = batch_index,
                        total_batches,
                        status = rejection.status,
                        records = records.len(),
                        response = %rejection.response,
                        "batch rejected"
                    );
                    counter!(BATCHES_FAILED).increment(1);
                    counter!(RECORDS_FAILED).increment(records.len() as u64);

                    report.failed_records.extend(records.iter().cloned());
                    report.batch_errors.push(BatchFailure {
                        batch_index,
                        status: rejection.status,
                        response: rejection.response,
                        record_count: records.len(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// One request per batch; the whole batch is the unit of failure
    async fn submit_batch(
        &self,
        records: &[Row],
        opts: &SubmitOptions,
    ) -> Result<u16, BatchRejection> {
        let method = match opts.method {
            SubmitMethod::Post => reqwest::Method::POST,
            SubmitMethod::Put => reqwest::Method::PUT,
        };

        let result = self
            .client
            .request(method, opts.target_url.clone())
            .json(&records)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                if status < 400 {
                    Ok(status)
                } else {
                    let body = response.text().await.unwrap_or_default();
                    Err(BatchRejection {
                        status,
                        response: truncate(&body),
                    })
                }
            }
            Err(e) => Err(BatchRejection {
                status: 0,
                response: truncate(&e.to_string()),
            }),
        }
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(RESPONSE_SNIPPET_LEN).collect()
}
