use crate::template::render;
use bundle::model::{EnrichmentRule, Row};
use serde_json::Value;

/// A fully rendered request for one (row, rule) pair, ready to hand to the
/// HTTP client.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    /// Uppercased HTTP method name
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

impl ApiRequest {
    pub fn build(rule: &EnrichmentRule, row: &Row) -> Self {
        let method = rule.method.as_deref().unwrap_or("GET").to_uppercase();
        let url = render(&rule.url_template, row);

        let headers = rule
            .headers
            .iter()
            .map(|(name, template)| (name.clone(), render(template, row)))
            .collect();

        let body = match &rule.body_template {
            Some(template) if method_has_body(&method) => {
                let rendered = render(template, row);
                // Templated bodies may be intentionally plain text; keep the
                // raw string when it does not parse as JSON.
                Some(
                    serde_json::from_str(&rendered)
                        .map(RequestBody::Json)
                        .unwrap_or(RequestBody::Text(rendered)),
                )
            }
            _ => None,
        };

        Self {
            method,
            url,
            headers,
            body,
        }
    }
}

fn method_has_body(method: &str) -> bool {
    matches!(method, "POST" | "PUT" | "PATCH")
}
