use serde_json::Value;

/// Extracts a value from a nested JSON structure using a dot-separated path.
///
/// At each step the current value must be an object with a matching key or an
/// array indexed by a base-10 segment; anything else resolves to `None`.
/// The empty path splits into a single empty segment, which matches no key,
/// so it also resolves to `None`.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;

    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}
