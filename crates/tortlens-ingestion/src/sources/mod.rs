//! External record source clients.

pub mod openfda;
pub mod courtlistener;

use serde_json::Value;

/// Trimmed, non-empty string at `value`, if any.
pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Join string entries of a JSON array, dropping blanks and
/// case-insensitive repeats while keeping first-seen order.
pub(crate) fn join_unique<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for v in values {
        let Some(term) = text(v) else { continue };
        if seen.insert(term.to_lowercase()) {
            out.push(term);
        }
    }
    out.join("; ")
}
