//! Concurrency-bounded fan-out of enrichment calls across the (rows x rules)
//! cross product.
//!
//! Every pair becomes one task in a [`JoinSet`], gated by a counting
//! semaphore so at most `concurrency` requests are in flight. Tasks complete
//! in arbitrary order; results are collected first and applied to the rows in
//! a single merge pass only after every task has finished, so no row is ever
//! written while requests are still running.

use crate::metrics_defs::{CALLS_FAILED, CALLS_TOTAL};
use crate::path::resolve;
use crate::request::{ApiRequest, RequestBody};
use bundle::counter;
use bundle::model::{EnrichmentRule, Row};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Why a single enrichment call fell back to the rule's fallback value
#[derive(Error, Debug)]
enum CallError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),
}

/// Per-task context that survives the HTTP call
struct CallTask {
    row_index: usize,
    target_key: String,
    response_path: String,
    fallback: Value,
}

/// Value produced for one (row, rule) pair, applied during the merge pass
struct CallResult {
    row_index: usize,
    target_key: String,
    value: Value,
    failed: bool,
}

/// Run-level counts reported back to the caller
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    /// Pairs in the (rows x rules) cross product
    pub total_calls: usize,

    /// Calls that substituted the fallback value after a failure
    pub failed_calls: usize,

    /// Tasks that did not complete (panicked or cancelled); their row field
    /// is left unwritten
    pub internal_errors: usize,
}

impl EnrichmentSummary {
    pub fn succeeded_calls(&self) -> usize {
        self.total_calls - self.failed_calls - self.internal_errors
    }
}

pub struct Enricher {
    client: reqwest::Client,
    concurrency: usize,
}

impl Enricher {
    pub fn new(concurrency: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            concurrency: concurrency.max(1),
        }
    }

    /// Applies every rule to every row, writing one field per rule into each
    /// row. Per-call failures substitute the rule's fallback value and never
    /// abort the run.
    pub async fn enrich(&self, rows: &mut [Row], rules: &[EnrichmentRule]) -> EnrichmentSummary {
        if rules.is_empty() {
            tracing::info!("no enrichment rules configured, passing rows through unchanged");
            return EnrichmentSummary::default();
        }

        let total_calls = rows.len() * rules.len();
        tracing::info!(
            rows = rows.len(),
            rules = rules.len(),
            total_calls,
            concurrency = self.concurrency,
            "starting enrichment fan-out"
        );
        counter!(CALLS_TOTAL).increment(total_calls as u64);

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        // Row-major task generation; execution order is up to the scheduler.
        for (row_index, row) in rows.iter().enumerate() {
            for rule in rules {
                let request = ApiRequest::build(rule, row);
                let task = CallTask {
                    row_index,
                    target_key: rule.target_key.clone(),
                    response_path: rule.response_path.clone(),
                    fallback: rule.fallback_value.clone(),
                };
                let client = self.client.clone();
                let semaphore = Arc::clone(&semaphore);

                join_set.spawn(async move {
                    // Acquired inside the task so spawning never blocks; the
                    // permit bounds in-flight requests. The semaphore is
                    // never closed, so acquisition cannot fail.
                    let _permit = semaphore.acquire_owned().await.ok();
                    execute_call(&client, request, task).await
                });
            }
        }

        // Barrier: collect every result before touching any row.
        let mut results = Vec::with_capacity(total_calls);
        let mut summary = EnrichmentSummary {
            total_calls,
            ..Default::default()
        };

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(error = %e, "enrichment task did not complete");
                    summary.internal_errors += 1;
                }
            }
        }

        // Single-writer merge pass; nothing is in flight any more. When two
        // rules share a target_key the last write here wins, in whatever
        // order the tasks happened to complete.
        for result in results {
            if result.failed {
                summary.failed_calls += 1;
            }
            if let Some(row) = rows.get_mut(result.row_index) {
                row.insert(result.target_key, result.value);
            }
        }

        tracing::info!(
            total = summary.total_calls,
            succeeded = summary.succeeded_calls(),
            failed = summary.failed_calls,
            "enrichment fan-out complete"
        );

        summary
    }
}

async fn execute_call(client: &reqwest::Client, request: ApiRequest, task: CallTask) -> CallResult {
    match perform(client, &request, &task.response_path).await {
        Ok(Some(value)) => CallResult {
            row_index: task.row_index,
            target_key: task.target_key,
            value,
            failed: false,
        },
        // The call succeeded but the path resolved to nothing; substituting
        // the fallback here is expected behavior, not a failure.
        Ok(None) => CallResult {
            row_index: task.row_index,
            target_key: task.target_key,
            value: task.fallback,
            failed: false,
        },
        Err(e) => {
            tracing::warn!(
                row = task.row_index,
                target_key = %task.target_key,
                url = %request.url,
                error = %e,
                "enrichment call failed, using fallback value"
            );
            counter!(CALLS_FAILED).increment(1);
            CallResult {
                row_index: task.row_index,
                target_key: task.target_key,
                value: task.fallback,
                failed: true,
            }
        }
    }
}

/// Issues one request and extracts the value at `response_path`.
///
/// `Ok(None)` means the request succeeded but the path resolved to nothing
/// (or to null); the caller substitutes the fallback.
async fn perform(
    client: &reqwest::Client,
    request: &ApiRequest,
    response_path: &str,
) -> Result<Option<Value>, CallError> {
    let method = reqwest::Method::from_bytes(request.method.as_bytes())
        .map_err(|e| CallError::InvalidRequest(e.to_string()))?;

    let mut builder = client.request(method, &request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name, value);
    }
    builder = match &request.body {
        Some(RequestBody::Json(json)) => builder.json(json),
        Some(RequestBody::Text(text)) => builder.body(text.clone()),
        None => builder,
    };

    let response = builder.send().await?;
    let status = response.status().as_u16();
    if status >= 400 {
        return Err(CallError::Status(status));
    }

    let text = response.text().await?;
    // Empty or non-JSON success bodies degrade to an empty object; the path
    // lookup then resolves to absent rather than failing the call.
    let body: Value =
        serde_json::from_str(&text).unwrap_or_else(|_| Value::Object(Default::default()));

    Ok(resolve(&body, response_path)
        .filter(|value| !value.is_null())
        .cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use hyper::body::{Bytes, Incoming};
    use hyper::service::service_fn;
    use hyper::{Request, Response, StatusCode};
    use hyper_util::rt::TokioExecutor;
    use serde_json::json;
    use std::collections::HashMap;
    use std::convert::Infallible;
    use std::time::Duration;
    use tokio::net::TcpListener;

    struct MockRequest {
        method: String,
        path: String,
        authorization: Option<String>,
        body: String,
    }

    type Responder = std::sync::Arc<dyn Fn(MockRequest) -> (StatusCode, String) + Send + Sync>;

    /// Start a mock HTTP upstream driven by the provided responder
    async fn start_mock_server(respond: Responder) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = hyper_util::rt::TokioIo::new(stream);
                let respond = respond.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let respond = respond.clone();
                        async move {
                            let (parts, body) = req.into_parts();
                            let body_bytes = body
                                .collect()
                                .await
                                .map(|collected| collected.to_bytes())
                                .unwrap_or_default();

                            let (status, response_body) = respond(MockRequest {
                                method: parts.method.to_string(),
                                path: parts.uri.path().to_string(),
                                authorization: parts
                                    .headers
                                    .get("authorization")
                                    .and_then(|v| v.to_str().ok())
                                    .map(String::from),
                                body: String::from_utf8_lossy(&body_bytes).into_owned(),
                            });

                            let response = Response::builder()
                                .status(status)
                                .body(Full::new(Bytes::from(response_body)))
                                .unwrap();
                            Ok::<_, Infallible>(response)
                        }
                    });

                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        port
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn rule(target_key: &str, url_template: &str, response_path: &str, fallback: Value) -> EnrichmentRule {
        EnrichmentRule {
            target_key: target_key.to_string(),
            url_template: url_template.to_string(),
            method: None,
            headers: HashMap::new(),
            body_template: None,
            response_path: response_path.to_string(),
            fallback_value: fallback,
        }
    }

    #[tokio::test]
    async fn mixed_success_and_server_error() {
        // /0 succeeds with a value, /1 returns HTTP 500
        let port = start_mock_server(std::sync::Arc::new(|req: MockRequest| {
            if req.path == "/0" {
                (StatusCode::OK, json!({"value": 42}).to_string())
            } else {
                (StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string())
            }
        }))
        .await;

        let mut rows = vec![row(json!({"id": 0})), row(json!({"id": 1}))];
        let rules = vec![rule(
            "target",
            &format!("http://127.0.0.1:{port}/{{{{id}}}}"),
            "value",
            json!(0),
        )];

        let summary = Enricher::new(5).enrich(&mut rows, &rules).await;

        assert_eq!(rows[0], row(json!({"id": 0, "target": 42})));
        assert_eq!(rows[1], row(json!({"id": 1, "target": 0})));
        assert_eq!(summary.total_calls, 2);
        assert_eq!(summary.failed_calls, 1);
        assert_eq!(summary.internal_errors, 0);
    }

    #[tokio::test]
    async fn empty_rule_set_is_a_no_op() {
        let original = vec![row(json!({"id": 1, "name": "a"}))];
        let mut rows = original.clone();

        let summary = Enricher::new(5).enrich(&mut rows, &[]).await;

        assert_eq!(summary, EnrichmentSummary::default());
        assert_eq!(
            serde_json::to_string(&rows).unwrap(),
            serde_json::to_string(&original).unwrap()
        );
    }

    #[tokio::test]
    async fn transport_failure_uses_fallback_for_every_row() {
        // Nothing listens on port 1; every call fails at the transport level
        let mut rows = vec![row(json!({"id": 0})), row(json!({"id": 1})), row(json!({"id": 2}))];
        let rules = vec![rule("status", "http://127.0.0.1:1/{{id}}", "value", json!("unknown"))];

        let summary = Enricher::new(2).enrich(&mut rows, &rules).await;

        for r in &rows {
            assert_eq!(r.get("status"), Some(&json!("unknown")));
        }
        assert_eq!(summary.failed_calls, 3);
    }

    #[tokio::test]
    async fn absent_response_path_resolves_to_fallback_without_failure() {
        let port = start_mock_server(std::sync::Arc::new(|_req| {
            (StatusCode::OK, json!({"unrelated": true}).to_string())
        }))
        .await;

        let mut rows = vec![row(json!({"id": 0}))];
        let rules = vec![rule(
            "target",
            &format!("http://127.0.0.1:{port}/item"),
            "missing.path",
            json!("fallback"),
        )];

        let summary = Enricher::new(5).enrich(&mut rows, &rules).await;

        assert_eq!(rows[0].get("target"), Some(&json!("fallback")));
        assert_eq!(summary.failed_calls, 0);
    }

    #[tokio::test]
    async fn non_json_success_body_degrades_to_fallback() {
        let port = start_mock_server(std::sync::Arc::new(|_req| {
            (StatusCode::OK, "plain text, not json".to_string())
        }))
        .await;

        let mut rows = vec![row(json!({"id": 0}))];
        let rules = vec![rule(
            "target",
            &format!("http://127.0.0.1:{port}/item"),
            "value",
            json!(null),
        )];

        let summary = Enricher::new(5).enrich(&mut rows, &rules).await;

        assert_eq!(rows[0].get("target"), Some(&Value::Null));
        assert_eq!(summary.failed_calls, 0);
    }

    #[tokio::test]
    async fn rendered_headers_and_body_reach_the_upstream() {
        let port = start_mock_server(std::sync::Arc::new(|req: MockRequest| {
            let body: Value = serde_json::from_str(&req.body).unwrap_or(Value::Null);
            if req.method == "POST"
                && req.authorization.as_deref() == Some("Bearer tok-1")
                && body["sku"] == json!("a-1")
            {
                (StatusCode::OK, json!({"value": "accepted"}).to_string())
            } else {
                (StatusCode::FORBIDDEN, "bad request shape".to_string())
            }
        }))
        .await;

        let mut lookup = rule("result", &format!("http://127.0.0.1:{port}/check"), "value", json!("rejected"));
        lookup.method = Some("POST".to_string());
        lookup
            .headers
            .insert("Authorization".to_string(), "Bearer {{token}}".to_string());
        lookup.body_template = Some(r#"{"sku": "{{sku}}"}"#.to_string());

        let mut rows = vec![row(json!({"sku": "a-1", "token": "tok-1"}))];
        let summary = Enricher::new(5).enrich(&mut rows, &[lookup]).await;

        assert_eq!(rows[0].get("result"), Some(&json!("accepted")));
        assert_eq!(summary.failed_calls, 0);
    }

    #[tokio::test]
    async fn each_rule_adds_exactly_one_key() {
        let port = start_mock_server(std::sync::Arc::new(|req: MockRequest| {
            (StatusCode::OK, json!({"value": req.path}).to_string())
        }))
        .await;

        let base = format!("http://127.0.0.1:{port}");
        let rules = vec![
            rule("first", &format!("{base}/first/{{{{id}}}}"), "value", Value::Null),
            rule("second", &format!("{base}/second/{{{{id}}}}"), "value", Value::Null),
        ];

        let mut rows = vec![row(json!({"id": 7, "kept": "yes"}))];
        Enricher::new(5).enrich(&mut rows, &rules).await;

        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "kept", "first", "second"]);
        assert_eq!(rows[0].get("first"), Some(&json!("/first/7")));
        assert_eq!(rows[0].get("second"), Some(&json!("/second/7")));
    }
}
