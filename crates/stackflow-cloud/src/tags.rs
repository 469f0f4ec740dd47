//! Resource tag synchronization

use crate::error::Result;
use crate::reconciler::{ApiCall, Run};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stackflow_api::Args;
use stackflow_api::args::scalar_text;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Desired tags of one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    /// Tag resource type as the API names it (e.g. "Snapshot")
    pub resource_type: String,
    pub tags: Vec<Tag>,
}

/// Tags carried by a remote object
pub fn existing_tags(resource: &Value, key: &str) -> Vec<Tag> {
    resource
        .get(key)
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .map(|t| {
                    Tag::new(
                        t.get("key").map(scalar_text).unwrap_or_default(),
                        t.get("value").map(scalar_text).unwrap_or_default(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn tag_list(tags: &[&Tag]) -> Value {
    tags.iter()
        .map(|t| serde_json::json!({"key": t.key, "value": t.value}))
        .collect()
}

/// Bring the tags of `resource` in line with `spec`
///
/// Removes undesired tags first, then adds missing ones, and refreshes
/// `resource["tags"]` afterwards. Returns whether anything differed. In dry
/// run the differences are only reported.
pub async fn ensure_tags(run: &Run<'_>, spec: &TagSpec, resource: &mut Value) -> Result<bool> {
    let Some(id) = resource.get("id").map(scalar_text) else {
        return Ok(false);
    };

    let existing = existing_tags(resource, "tags");
    let stale: Vec<&Tag> = existing.iter().filter(|t| !spec.tags.contains(t)).collect();
    let missing: Vec<&Tag> = spec.tags.iter().filter(|t| !existing.contains(t)).collect();

    if stale.is_empty() && missing.is_empty() {
        return Ok(false);
    }

    for (command, tags) in [("deleteTags", stale), ("createTags", missing)] {
        if tags.is_empty() {
            continue;
        }
        tracing::debug!("{} {} tag(s) on {} {}", command, tags.len(), spec.resource_type, id);
        let args = Args::new()
            .with("resourceids", id.as_str())
            .with("resourcetype", spec.resource_type.as_str())
            .with("tags", tag_list(&tags));
        run.execute(&ApiCall::new(command, args)).await?;
    }

    if !run.is_dry_run() {
        let args = Args::new()
            .with("resourceid", id.as_str())
            .with("resourcetype", spec.resource_type.as_str());
        let tags = run.gateway().list("listTags", &args).await?;
        if let Value::Object(fields) = resource {
            fields.insert("tags".to_string(), Value::Array(tags));
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::{JobPoller, PollConfig};
    use crate::reconciler::RunOptions;
    use crate::scope::ScopeContext;
    use serde_json::json;
    use stackflow_api::Gateway;
    use stackflow_api::mock::MockTransport;
    use std::sync::Arc;

    fn spec(tags: &[(&str, &str)]) -> TagSpec {
        TagSpec {
            resource_type: "Snapshot".to_string(),
            tags: tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect(),
        }
    }

    #[tokio::test]
    async fn test_tags_in_sync() {
        let mock = Arc::new(MockTransport::new());
        let gateway = Gateway::new(mock.clone());
        let poller = JobPoller::new(gateway.clone(), PollConfig::default());
        let scope = ScopeContext::new();
        let run = Run::new(&gateway, &poller, &scope, RunOptions::default());

        let mut resource = json!({"id": "s-1", "tags": [{"key": "env", "value": "prod"}]});
        let changed = ensure_tags(&run, &spec(&[("env", "prod")]), &mut resource)
            .await
            .unwrap();

        assert!(!changed);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tags_updated() {
        let mock = Arc::new(MockTransport::new());
        mock.respond("deleteTags", json!({"jobid": "j-del"}));
        mock.respond("createTags", json!({"jobid": "j-add"}));
        mock.respond("queryAsyncJobResult", json!({"jobstatus": 1, "jobresult": {"success": true}}));
        mock.respond(
            "listTags",
            json!({"count": 1, "tag": [{"key": "env", "value": "staging"}]}),
        );
        let gateway = Gateway::new(mock.clone());
        let poller = JobPoller::new(gateway.clone(), PollConfig::default());
        let scope = ScopeContext::new();
        let run = Run::new(&gateway, &poller, &scope, RunOptions::default());

        let mut resource = json!({"id": "s-1", "tags": [{"key": "env", "value": "prod"}]});
        let changed = ensure_tags(&run, &spec(&[("env", "staging")]), &mut resource)
            .await
            .unwrap();

        assert!(changed);
        assert_eq!(
            mock.commands(),
            vec![
                "deleteTags",
                "queryAsyncJobResult",
                "createTags",
                "queryAsyncJobResult",
                "listTags"
            ]
        );
        let created = &mock.calls_to("createTags")[0];
        assert_eq!(created.get_str("resourceids"), Some("s-1"));
        assert_eq!(created.get("tags"), Some(&json!([{"key": "env", "value": "staging"}])));
        assert_eq!(resource["tags"][0]["value"], "staging");
    }

    #[tokio::test]
    async fn test_tags_dry_run() {
        let mock = Arc::new(MockTransport::new());
        let gateway = Gateway::new(mock.clone());
        let poller = JobPoller::new(gateway.clone(), PollConfig::default());
        let scope = ScopeContext::new();
        let options = RunOptions {
            dry_run: true,
            ..RunOptions::default()
        };
        let run = Run::new(&gateway, &poller, &scope, options);

        let mut resource = json!({"id": "s-1"});
        let changed = ensure_tags(&run, &spec(&[("env", "prod")]), &mut resource)
            .await
            .unwrap();

        assert!(changed);
        assert!(mock.calls().is_empty());
    }
}
