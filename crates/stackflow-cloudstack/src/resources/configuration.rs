//! Global and scoped configuration values

use async_trait::async_trait;
use serde_json::Value;
use stackflow_api::Args;
use stackflow_cloud::{
    ApiCall, ManagedResource, ReconcileError, Requirement, ResourceKind, Result, Run,
    TargetState,
};

/// One configuration value, global or scoped to a zone, cluster, storage
/// pool or account
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub name: String,
    pub value: String,
}

impl Configuration {
    pub fn new(name: impl Into<String>, value: &Value) -> Self {
        Self {
            name: name.into(),
            value: normalize_value(value),
        }
    }

    /// `name` plus the ids of whichever scopes were given
    async fn scoped_args(&self, run: &mut Run<'_>) -> Result<Args> {
        let resolver = run.resolver();
        let account = resolver.id(ResourceKind::Account, Requirement::Optional).await?;
        let storage = resolver.id(ResourceKind::StoragePool, Requirement::Optional).await?;
        let zone = resolver.id(ResourceKind::Zone, Requirement::Optional).await?;
        let cluster = resolver.id(ResourceKind::Cluster, Requirement::Optional).await?;

        Ok(Args::new()
            .with("name", self.name.as_str())
            .with_opt("accountid", account)
            .with_opt("storageid", storage)
            .with_opt("zoneid", zone)
            .with_opt("clusterid", cluster))
    }
}

/// Textual value as the API stores it; `True`/`False` are lower-cased
pub fn normalize_value(value: &Value) -> String {
    match value {
        Value::String(s) if s == "True" || s == "False" => s.to_lowercase(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ManagedResource for Configuration {
    fn kind(&self) -> &str {
        "configuration"
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn supported_states(&self) -> &[TargetState] {
        &[TargetState::Present]
    }

    async fn fetch_current(&self, run: &mut Run<'_>) -> Result<Option<Value>> {
        let args = self.scoped_args(run).await?;
        let configurations = run.gateway().list("listConfigurations", &args).await?;
        if configurations.is_empty() {
            return Err(ReconcileError::not_found("configuration", self.name.as_str()));
        }

        Ok(configurations
            .into_iter()
            .find(|c| c.get("name").and_then(Value::as_str) == Some(self.name.as_str())))
    }

    fn comparable_fields(&self) -> &[&'static str] {
        &["value"]
    }

    async fn desired_args(&self, run: &mut Run<'_>) -> Result<Args> {
        Ok(self
            .scoped_args(run)
            .await?
            .with("value", self.value.as_str()))
    }

    fn present_call(&self, _current: Option<&Value>, desired: &Args) -> Result<ApiCall> {
        Ok(ApiCall::new("updateConfiguration", desired.clone()).with_result_key("configuration"))
    }

    fn absent_call(&self, _current: &Value) -> Result<ApiCall> {
        Err(ReconcileError::UnsupportedState {
            kind: self.kind().to_string(),
            state: TargetState::Absent.to_string(),
        })
    }

    fn returns(&self) -> &[(&'static str, &'static str)] {
        &[("category", "category"), ("scope", "scope"), ("value", "value")]
    }
}
