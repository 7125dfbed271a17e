use bundle::model::Row;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.+?)\}\}").expect("placeholder pattern is valid"));

/// Substitutes every `{{field}}` placeholder with the row's value for that
/// field. Missing and null fields render as the empty string; strings render
/// unquoted; other values render in their compact JSON form. Rendering never
/// fails.
pub fn render(template: &str, row: &Row) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }

    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match row.get(&caps[1]) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        })
        .into_owned()
}
