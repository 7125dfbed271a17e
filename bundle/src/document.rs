//! On-disk document shapes exchanged between the pipeline stages.
//!
//! The enrichment stage consumes a [`crate::model::Bundle`] and produces an
//! [`EnrichedDocument`]; the submission stage consumes an `EnrichedDocument`
//! and produces a [`FailureReport`] plus a [`RetryPayload`]. The retry
//! payload deserializes as an `EnrichedDocument` again (its `meta` defaults
//! to empty), so failed records feed straight back into submission.

use crate::BundleError;
use crate::model::{Row, SubmissionConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Output of the enrichment stage and input of the submission stage
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EnrichedDocument {
    #[serde(default)]
    pub meta: serde_json::Map<String, Value>,

    #[serde(default)]
    pub submission: SubmissionConfig,

    #[serde(default)]
    pub data: Vec<Row>,
}

/// Detail for one rejected batch, kept in the failure artifact
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct BatchFailure {
    /// 1-based position of the batch in submission order
    pub batch_index: usize,

    /// HTTP status of the rejection, 0 for transport-level failures
    pub status: u16,

    /// Response or error text, truncated for storage
    pub response: String,

    pub record_count: usize,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct FailureSummary {
    pub total_failed: usize,
    pub failed_batches: usize,
    pub target_url: String,
    pub timestamp: String,
}

/// Failure artifact: enough detail to diagnose a partial run and resubmit it
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FailureReport {
    pub summary: FailureSummary,
    pub batch_errors: Vec<BatchFailure>,
    pub failed_records: Vec<Row>,
}

/// Regenerated submission input holding exactly the records that failed
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RetryPayload {
    pub submission: SubmissionConfig,
    pub data: Vec<Row>,
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BundleError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BundleError> {
    let data = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, data)?;
    Ok(())
}

impl crate::model::Bundle {
    pub fn from_file(path: &Path) -> Result<Self, BundleError> {
        read_json(path)
    }
}

impl EnrichedDocument {
    pub fn from_file(path: &Path) -> Result<Self, BundleError> {
        read_json(path)
    }

    pub fn write_file(&self, path: &Path) -> Result<(), BundleError> {
        write_json(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubmitMethod;
    use serde_json::json;

    fn row(pairs: Value) -> Row {
        match pairs {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn enriched_document_round_trip() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let path = tmp.path().join("enriched.json");

        let document = EnrichedDocument {
            meta: row(json!({"version": "3"})),
            submission: SubmissionConfig {
                target_url: Some("https://dest.example.com/import".to_string()),
                method: Some(SubmitMethod::Post),
                batch_size: Some(2),
            },
            data: vec![row(json!({"id": 1, "price": 42}))],
        };

        document.write_file(&path).expect("write document");
        let loaded = EnrichedDocument::from_file(&path).expect("load document");

        assert_eq!(loaded.data, document.data);
        assert_eq!(loaded.submission, document.submission);
    }

    #[test]
    fn retry_payload_is_a_valid_submission_input() {
        let payload = RetryPayload {
            submission: SubmissionConfig {
                target_url: Some("https://dest.example.com/import".to_string()),
                method: None,
                batch_size: Some(50),
            },
            data: vec![row(json!({"id": 7}))],
        };

        let serialized = serde_json::to_value(&payload).unwrap();
        let reloaded: EnrichedDocument = serde_json::from_value(serialized).unwrap();

        assert!(reloaded.meta.is_empty());
        assert_eq!(reloaded.data, payload.data);
        assert_eq!(reloaded.submission, payload.submission);
    }

    #[test]
    fn read_json_reports_missing_file() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let missing = tmp.path().join("does_not_exist.json");

        let result: Result<EnrichedDocument, _> = read_json(&missing);
        assert!(matches!(result.unwrap_err(), BundleError::Io(_)));
    }

    #[test]
    fn read_json_reports_malformed_document() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, b"{not json").unwrap();

        let result: Result<EnrichedDocument, _> = read_json(&path);
        assert!(matches!(result.unwrap_err(), BundleError::Json(_)));
    }

    #[test]
    fn row_field_order_survives_round_trip() {
        let text = r#"{"zebra": 1, "alpha": 2, "mid": 3}"#;
        let parsed: Row = serde_json::from_str(text).unwrap();
        let keys: Vec<&str> = parsed.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zebra", "alpha", "mid"]);

        let back = serde_json::to_string(&parsed).unwrap();
        assert_eq!(back, r#"{"zebra":1,"alpha":2,"mid":3}"#);
    }
}
