//! Projection of remote objects into output records

use crate::diff::Diff;
use serde::Serialize;
use serde_json::{Map, Value};

/// Remote attribute → output field, shared by every resource kind
pub const COMMON_RETURNS: &[(&str, &str)] = &[
    ("id", "id"),
    ("name", "name"),
    ("created", "created"),
    ("zonename", "zone"),
    ("state", "state"),
    ("project", "project"),
    ("account", "account"),
    ("domain", "domain"),
    ("displaytext", "display_text"),
    ("displayname", "display_name"),
    ("description", "description"),
];

/// What a reconciliation reports back to the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutputRecord {
    pub changed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Diff>,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl OutputRecord {
    pub fn new(changed: bool, fields: Map<String, Value>) -> Self {
        Self {
            changed,
            diff: None,
            fields,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }
}

/// Flatten `resource` into output fields
///
/// Scope names go in first so that attributes of the resource itself win
/// on a name clash, except for the domain: its resolved path replaces the
/// bare domain name the resource carries. `returns` extends
/// [`COMMON_RETURNS`]. Attributes the resource lacks are left out.
pub fn project(
    resource: Option<&Value>,
    returns: &[(&str, &str)],
    scope_names: &[(&'static str, String)],
) -> Map<String, Value> {
    let mut fields = Map::new();
    for (key, name) in scope_names {
        fields.insert((*key).to_string(), Value::String(name.clone()));
    }

    let Some(resource) = resource else {
        return fields;
    };

    for (remote, output) in COMMON_RETURNS.iter().chain(returns) {
        if let Some(value) = resource.get(*remote) {
            fields.insert((*output).to_string(), value.clone());
        }
    }

    if let Some(tags) = resource.get("tags") {
        fields.insert("tags".to_string(), tags.clone());
    }

    if let Some((key, path)) = scope_names.iter().find(|(key, _)| *key == "domain") {
        fields.insert((*key).to_string(), Value::String(path.clone()));
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_common_and_extra_returns() {
        let resource = json!({
            "id": "s-1",
            "name": "before-upgrade",
            "zonename": "zone01",
            "displayname": "before upgrade",
            "type": "DiskAndMemory",
            "unknown": "dropped"
        });

        let fields = project(Some(&resource), &[("type", "type")], &[]);
        assert_eq!(fields["id"], "s-1");
        assert_eq!(fields["zone"], "zone01");
        assert_eq!(fields["display_name"], "before upgrade");
        assert_eq!(fields["type"], "DiskAndMemory");
        assert!(!fields.contains_key("unknown"));
        assert!(!fields.contains_key("created"));
    }

    #[test]
    fn test_resource_overrides_scope_names() {
        let resource = json!({"zonename": "zone01-real", "account": "acme"});
        let scope = vec![
            ("zone", "zone01".to_string()),
            ("vm", "web-01".to_string()),
        ];

        let fields = project(Some(&resource), &[], &scope);
        assert_eq!(fields["zone"], "zone01-real");
        assert_eq!(fields["vm"], "web-01");
        assert_eq!(fields["account"], "acme");
    }

    #[test]
    fn test_domain_path_overrides_resource_domain() {
        let resource = json!({"id": "g-1", "domain": "customers", "account": "acme"});
        let scope = vec![
            ("domain", "ROOT/customers".to_string()),
            ("account", "acme inc".to_string()),
        ];

        let fields = project(Some(&resource), &[], &scope);
        assert_eq!(fields["domain"], "ROOT/customers");
        assert_eq!(fields["account"], "acme");

        let fields = project(Some(&json!({"id": "g-1", "domain": "customers"})), &[], &[]);
        assert_eq!(fields["domain"], "customers");
    }

    #[test]
    fn test_tags_copied() {
        let resource = json!({"id": "s-1", "tags": [{"key": "env", "value": "prod"}]});
        let fields = project(Some(&resource), &[], &[]);
        assert_eq!(fields["tags"][0]["key"], "env");
    }

    #[test]
    fn test_record_serializes_flat() {
        let mut record = OutputRecord::new(true, Map::new());
        record.insert("name", "limit.cpu");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, json!({"changed": true, "name": "limit.cpu"}));
    }
}
