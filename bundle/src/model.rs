use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One record to be enriched and eventually submitted. Enrichment appends
/// one field per rule (the rule's `target_key`); existing fields and their
/// order are preserved.
pub type Row = serde_json::Map<String, Value>;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("enrichment rule {0} has an empty target_key")]
    EmptyTargetKey(usize),

    #[error("batch size cannot be 0")]
    InvalidBatchSize,

    #[error("unsupported submission method: {0} (expected POST or PUT)")]
    UnsupportedMethod(String),
}

/// HTTP methods supported for batch submission
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmitMethod {
    Post,
    Put,
}

impl SubmitMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SubmitMethod::Post => "POST",
            SubmitMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for SubmitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmitMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(SubmitMethod::Post),
            "PUT" => Ok(SubmitMethod::Put),
            other => Err(ValidationError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Declarative spec for one API lookup that enriches a row with a new field
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct EnrichmentRule {
    /// Field written into the row with the looked-up value
    pub target_key: String,

    /// Request URL with `{{field}}` placeholders rendered per row
    pub url_template: String,

    /// HTTP method, defaults to GET
    #[serde(default)]
    pub method: Option<String>,

    /// Header values are templates rendered against the row
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Request body template, only used for body-bearing methods
    #[serde(default)]
    pub body_template: Option<String>,

    /// Dot-path into the response body selecting the value to extract
    pub response_path: String,

    /// Substitute value when the lookup fails or resolves to nothing
    #[serde(default)]
    pub fallback_value: Value,
}

/// Destination settings for batch submission. All fields are optional in the
/// document; defaults are applied when the effective settings are resolved,
/// so the config round-trips into retry payloads unchanged.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct SubmissionConfig {
    #[serde(default)]
    pub target_url: Option<String>,

    #[serde(default)]
    pub method: Option<SubmitMethod>,

    #[serde(default)]
    pub batch_size: Option<u32>,
}

/// Transformation rules carried by a job bundle
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct JobConfig {
    /// Static column rules are applied by the bundle producer; passed through untouched
    #[serde(default)]
    pub static_rules: Vec<Value>,

    #[serde(default)]
    pub enrichment_rules: Vec<EnrichmentRule>,

    #[serde(default)]
    pub submission: SubmissionConfig,
}

impl JobConfig {
    /// Validates the rule set before any network work starts
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for (index, rule) in self.enrichment_rules.iter().enumerate() {
            if rule.target_key.is_empty() {
                return Err(ValidationError::EmptyTargetKey(index));
            }

            if !seen.insert(&rule.target_key) {
                // Not fatal: the last lookup to complete wins, in arbitrary
                // completion order. Rule authors should use unique keys.
                tracing::warn!(
                    target_key = %rule.target_key,
                    "duplicate target_key across enrichment rules; final value is the last write"
                );
            }
        }

        if self.submission.batch_size == Some(0) {
            return Err(ValidationError::InvalidBatchSize);
        }

        Ok(())
    }
}

/// The combined input document: source rows plus the rules describing how to
/// transform and submit them.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Bundle {
    /// Opaque producer metadata, passed through to the enriched output
    #[serde(default)]
    pub meta: serde_json::Map<String, Value>,

    #[serde(default)]
    pub config: JobConfig,

    #[serde(default)]
    pub source_data: Vec<Row>,
}
