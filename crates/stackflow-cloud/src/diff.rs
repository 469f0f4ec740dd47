//! Desired-versus-current comparison

use serde::Serialize;
use serde_json::{Map, Value};
use stackflow_api::Args;
use stackflow_api::args::scalar_text;

/// Attributes that differ between the server and the desired state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diff {
    pub before: Map<String, Value>,
    pub after: Map<String, Value>,
}

impl Diff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    pub fn record(&mut self, key: &str, before: Option<&Value>, after: &Value) {
        if let Some(before) = before {
            self.before.insert(key.to_string(), before.clone());
        }
        self.after.insert(key.to_string(), after.clone());
    }

    /// Diff of an object that is about to be created
    pub fn created(desired: &Args) -> Self {
        Self {
            before: Map::new(),
            after: desired.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    /// Diff of an object that is about to be deleted
    pub fn removed(current: &Value) -> Self {
        Self {
            before: current.as_object().cloned().unwrap_or_default(),
            after: Map::new(),
        }
    }
}

/// Compare `fields` of `desired` against `current`
///
/// Desired fields that are not given are ignored. A field the server object
/// lacks counts as a difference.
pub fn compare(desired: &Args, current: &Value, fields: &[&str]) -> Diff {
    let mut diff = Diff::new();
    for field in fields {
        let Some(want) = desired.get(field) else {
            continue;
        };
        match current.get(*field) {
            Some(have) if values_equal(want, have) => {}
            have => diff.record(field, have, want),
        }
    }
    diff
}

/// Server-side equivalence of two attribute values
///
/// Numbers compare numerically (the API often returns them as strings),
/// everything else compares as case-insensitive text, which also makes
/// `True` equal to `true`.
pub fn values_equal(want: &Value, have: &Value) -> bool {
    if let Value::Number(n) = want {
        return match (n.as_f64(), number_of(have)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
    }
    scalar_text(want).to_lowercase() == scalar_text(have).to_lowercase()
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(_) => false,
    }
}

/// Nothing to set and nothing set: every desired value of `fields` is empty
/// and the server object carries none of them
pub fn nothing_to_set(desired: &Args, current: Option<&Value>, fields: &[&str]) -> bool {
    if fields.is_empty() {
        return false;
    }
    let desired_empty = fields.iter().all(|f| is_empty_value(desired.get(f)));
    let current_bare = current.is_none_or(|c| fields.iter().all(|f| c.get(*f).is_none()));
    desired_empty && current_bare
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_compares_numerically() {
        assert!(values_equal(&json!(8), &json!("8")));
        assert!(values_equal(&json!(1.5), &json!("1.50")));
        assert!(!values_equal(&json!(8), &json!("eight")));
    }

    #[test]
    fn test_text_compares_case_insensitively() {
        assert!(values_equal(&json!("true"), &json!("True")));
        assert!(values_equal(&json!(true), &json!("true")));
        assert!(!values_equal(&json!("8"), &json!("4")));
    }

    #[test]
    fn test_compare_records_only_differences() {
        let desired = Args::new().with("value", "8").with("name", "limit.cpu");
        let current = json!({"name": "LIMIT.CPU", "value": "4"});

        let diff = compare(&desired, &current, &["name", "value"]);
        assert_eq!(diff.before, json!({"value": "4"}).as_object().cloned().unwrap());
        assert_eq!(diff.after, json!({"value": "8"}).as_object().cloned().unwrap());
    }

    #[test]
    fn test_compare_ignores_unset_and_flags_missing() {
        let desired = Args::new().with("description", "nightly");
        let current = json!({"name": "snap"});

        let diff = compare(&desired, &current, &["name", "description"]);
        assert!(diff.before.is_empty());
        assert_eq!(diff.after["description"], "nightly");
    }

    #[test]
    fn test_nothing_to_set() {
        let empty = Args::new().with("value", "");
        assert!(nothing_to_set(&empty, None, &["value"]));
        assert!(nothing_to_set(&empty, Some(&json!({"name": "x"})), &["value"]));
        assert!(!nothing_to_set(&empty, Some(&json!({"value": "4"})), &["value"]));
        assert!(!nothing_to_set(&Args::new().with("value", "8"), None, &["value"]));
        assert!(!nothing_to_set(&empty, None, &[]));
    }
}
