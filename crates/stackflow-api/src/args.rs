//! Arguments of a single API command

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Flat argument mapping for one API command.
///
/// Absent values are never stored: CloudStack treats a missing parameter as
/// "no filter", while an empty one is a filter on the empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Args {
    params: BTreeMap<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn with_opt<V: Into<Value>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        if value.is_null() {
            return;
        }
        self.params.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.params.iter()
    }

    /// Wire form: `(name, value)` string pairs. Scalars are stringified,
    /// lists of objects become `name[i].field` pairs (tags and similar
    /// map parameters), lists of scalars are joined with commas.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.params {
            match value {
                Value::Array(items) if items.iter().all(Value::is_object) => {
                    for (i, item) in items.iter().enumerate() {
                        if let Value::Object(fields) = item {
                            for (field, v) in fields {
                                pairs.push((format!("{}[{}].{}", key, i, field), scalar_text(v)));
                            }
                        }
                    }
                }
                Value::Array(items) => {
                    let joined = items.iter().map(scalar_text).collect::<Vec<_>>().join(",");
                    pairs.push((key.clone(), joined));
                }
                other => pairs.push((key.clone(), scalar_text(other))),
            }
        }
        pairs
    }
}

/// Textual form of a scalar as CloudStack expects it
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
