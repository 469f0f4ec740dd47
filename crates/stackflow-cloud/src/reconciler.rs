//! Reconciliation of one resource towards its target state
//!
//! Every resource kind implements [`ManagedResource`]: how to find the
//! current object, which attributes are compared, and which commands move
//! it towards `present`, `absent` or `revert`. [`Reconciler`] owns the
//! generic part: diffing, dry-run gating, job polling, tag sync and the
//! output record.

use crate::diff::{self, Diff};
use crate::error::{ReconcileError, Result};
use crate::poller::{JobHandle, JobPoller, PollConfig};
use crate::projector::{self, OutputRecord};
use crate::resolver::Resolver;
use crate::scope::ScopeContext;
use crate::tags::{self, TagSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stackflow_api::args::scalar_text;
use stackflow_api::{Args, Gateway};

/// Target state of a desired-state record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    #[default]
    Present,
    Absent,
    Revert,
}

impl std::fmt::Display for TargetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetState::Present => write!(f, "present"),
            TargetState::Absent => write!(f, "absent"),
            TargetState::Revert => write!(f, "revert"),
        }
    }
}

/// Per-run switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Compute `changed` but issue no mutating call
    pub dry_run: bool,

    /// Wait for async jobs and report their result
    pub poll_async: bool,

    /// Attach before/after attributes to the output record
    pub diff: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            poll_async: true,
            diff: false,
        }
    }
}

/// A mutating command with its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub command: String,
    pub args: Args,

    /// Field of the (job) result holding the affected object
    pub result_key: Option<String>,
}

impl ApiCall {
    pub fn new(command: impl Into<String>, args: Args) -> Self {
        Self {
            command: command.into(),
            args,
            result_key: None,
        }
    }

    pub fn with_result_key(mut self, key: impl Into<String>) -> Self {
        self.result_key = Some(key.into());
        self
    }
}

/// State of one reconciliation invocation
///
/// Owns the resolver cache; created by [`Reconciler::reconcile`] and dropped
/// when it returns.
pub struct Run<'a> {
    gateway: &'a Gateway,
    poller: &'a JobPoller,
    resolver: Resolver<'a>,
    options: RunOptions,
}

impl<'a> Run<'a> {
    pub fn new(
        gateway: &'a Gateway,
        poller: &'a JobPoller,
        scope: &'a ScopeContext,
        options: RunOptions,
    ) -> Self {
        Self {
            gateway,
            poller,
            resolver: Resolver::new(gateway, scope),
            options,
        }
    }

    pub fn gateway(&self) -> &'a Gateway {
        self.gateway
    }

    pub fn resolver(&mut self) -> &mut Resolver<'a> {
        &mut self.resolver
    }

    pub fn scope_names(&self) -> Vec<(&'static str, String)> {
        self.resolver.scope_names()
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Issue `call` unless this is a dry run
    ///
    /// Returns the affected object: the job result when the call started a
    /// job and polling is enabled, the synchronous payload otherwise.
    /// `None` in dry run, or for an async call that is not polled.
    pub async fn execute(&self, call: &ApiCall) -> Result<Option<Value>> {
        if self.options.dry_run {
            tracing::info!("Dry run: skipping {}", call.command);
            return Ok(None);
        }

        tracing::info!("Calling {}", call.command);
        let response = self.gateway.invoke(&call.command, &call.args).await?;

        let key = call.result_key.as_deref();
        if JobHandle::from_response(&response, key).is_some() && !self.options.poll_async {
            tracing::debug!("{} started a job, not waiting for it", call.command);
            return Ok(None);
        }
        self.poller.settle(response, key).await.map(Some)
    }
}

/// One kind of remote resource under reconciliation
#[async_trait]
pub trait ManagedResource: Send + Sync {
    /// Kind label used in messages (e.g. "VM snapshot")
    fn kind(&self) -> &str;

    /// Name of this record's resource, used in messages
    fn name(&self) -> String;

    fn supported_states(&self) -> &[TargetState] {
        &[TargetState::Present, TargetState::Absent]
    }

    /// Current server object, `None` if it does not exist
    async fn fetch_current(&self, run: &mut Run<'_>) -> Result<Option<Value>>;

    /// Attributes compared for `present`; empty means existence only
    fn comparable_fields(&self) -> &[&'static str] {
        &[]
    }

    /// Desired attributes, with scope ids filled in
    async fn desired_args(&self, run: &mut Run<'_>) -> Result<Args>;

    /// Create (`current` is `None`) or update call
    fn present_call(&self, current: Option<&Value>, desired: &Args) -> Result<ApiCall>;

    fn absent_call(&self, current: &Value) -> Result<ApiCall>;

    fn revert_call(&self, _current: &Value) -> Result<ApiCall> {
        Err(ReconcileError::UnsupportedState {
            kind: self.kind().to_string(),
            state: TargetState::Revert.to_string(),
        })
    }

    /// Status field and the value it must have before a revert
    fn ready_state(&self) -> Option<(&'static str, &'static str)> {
        None
    }

    /// Resource-specific projection table, on top of the common one
    fn returns(&self) -> &[(&'static str, &'static str)] {
        &[]
    }

    /// Tag resource type and desired tags, for kinds that carry tags
    fn tags(&self) -> Option<TagSpec> {
        None
    }

    async fn project(
        &self,
        run: &mut Run<'_>,
        resource: Option<&Value>,
    ) -> Result<Map<String, Value>> {
        Ok(projector::project(
            resource,
            self.returns(),
            &run.scope_names(),
        ))
    }
}

struct Outcome {
    changed: bool,
    diff: Diff,
    object: Option<Value>,
}

impl Outcome {
    fn unchanged(object: Option<Value>) -> Self {
        Self {
            changed: false,
            diff: Diff::new(),
            object,
        }
    }
}

/// Entry point of the reconciliation core
#[derive(Clone)]
pub struct Reconciler {
    gateway: Gateway,
    poller: JobPoller,
}

impl Reconciler {
    pub fn new(gateway: Gateway, poll: PollConfig) -> Self {
        let poller = JobPoller::new(gateway.clone(), poll);
        Self { gateway, poller }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// Drive `resource` towards `target` within a fresh run
    pub async fn reconcile(
        &self,
        resource: &dyn ManagedResource,
        scope: &ScopeContext,
        options: RunOptions,
        target: TargetState,
    ) -> Result<OutputRecord> {
        if !resource.supported_states().contains(&target) {
            return Err(ReconcileError::UnsupportedState {
                kind: resource.kind().to_string(),
                state: target.to_string(),
            });
        }

        tracing::debug!(
            "Reconciling {} '{}' to {}{}",
            resource.kind(),
            resource.name(),
            target,
            if options.dry_run { " (dry run)" } else { "" }
        );

        let mut run = Run::new(&self.gateway, &self.poller, scope, options);
        let outcome = match target {
            TargetState::Present => ensure_present(resource, &mut run).await?,
            TargetState::Absent => ensure_absent(resource, &mut run).await?,
            TargetState::Revert => ensure_revert(resource, &mut run).await?,
        };

        let fields = resource.project(&mut run, outcome.object.as_ref()).await?;
        let mut record = OutputRecord::new(outcome.changed, fields);
        if options.diff {
            record.diff = Some(outcome.diff);
        }
        Ok(record)
    }
}

async fn ensure_present(resource: &dyn ManagedResource, run: &mut Run<'_>) -> Result<Outcome> {
    let current = resource.fetch_current(run).await?;
    let desired = resource.desired_args(run).await?;
    let fields = resource.comparable_fields();

    let (mut changed, diff) = if diff::nothing_to_set(&desired, current.as_ref(), fields) {
        tracing::debug!("{} '{}': nothing to set", resource.kind(), resource.name());
        (false, Diff::new())
    } else {
        match &current {
            None => (true, Diff::created(&desired)),
            Some(_) if fields.is_empty() => (false, Diff::new()),
            Some(existing) => {
                let diff = diff::compare(&desired, existing, fields);
                (!diff.is_empty(), diff)
            }
        }
    };

    let mut object = current.clone();
    if changed {
        let call = resource.present_call(current.as_ref(), &desired)?;
        if let Some(result) = run.execute(&call).await? {
            object = Some(result);
        }
    }

    if let (Some(spec), Some(target)) = (resource.tags(), object.as_mut()) {
        changed |= tags::ensure_tags(run, &spec, target).await?;
    }

    Ok(Outcome {
        changed,
        diff,
        object,
    })
}

async fn ensure_absent(resource: &dyn ManagedResource, run: &mut Run<'_>) -> Result<Outcome> {
    let Some(current) = resource.fetch_current(run).await? else {
        return Ok(Outcome::unchanged(None));
    };

    let call = resource.absent_call(&current)?;
    run.execute(&call).await?;

    Ok(Outcome {
        changed: true,
        diff: Diff::removed(&current),
        object: Some(current),
    })
}

async fn ensure_revert(resource: &dyn ManagedResource, run: &mut Run<'_>) -> Result<Outcome> {
    let Some(current) = resource.fetch_current(run).await? else {
        tracing::debug!("{} '{}' does not exist, could not revert", resource.kind(), resource.name());
        return Err(ReconcileError::not_found(resource.kind(), resource.name()));
    };

    if let Some((field, ready)) = resource.ready_state() {
        let status = current.get(field).map(scalar_text).unwrap_or_default();
        if status != ready {
            return Err(ReconcileError::InvalidState {
                kind: resource.kind().to_string(),
                status,
                expected: ready.to_string(),
            });
        }
    }

    let call = resource.revert_call(&current)?;
    run.execute(&call).await?;

    Ok(Outcome {
        changed: true,
        diff: Diff::new(),
        object: Some(current),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{Requirement, ResourceKind};
    use serde_json::json;
    use stackflow_api::mock::MockTransport;
    use std::sync::Arc;
    use std::time::Duration;

    /// Zone-scoped widget with a `size` attribute
    struct Widget {
        name: String,
        size: Option<u64>,
    }

    #[async_trait]
    impl ManagedResource for Widget {
        fn kind(&self) -> &str {
            "widget"
        }

        fn name(&self) -> String {
            self.name.clone()
        }

        fn supported_states(&self) -> &[TargetState] {
            &[TargetState::Present, TargetState::Absent, TargetState::Revert]
        }

        async fn fetch_current(&self, run: &mut Run<'_>) -> Result<Option<Value>> {
            let zone = run.resolver().id(ResourceKind::Zone, Requirement::Mandatory).await?;
            let args = Args::new().with_opt("zoneid", zone).with("name", self.name.as_str());
            let widgets = run.gateway().list("listWidgets", &args).await?;
            Ok(widgets.into_iter().next())
        }

        fn comparable_fields(&self) -> &[&'static str] {
            &["size"]
        }

        async fn desired_args(&self, run: &mut Run<'_>) -> Result<Args> {
            let zone = run.resolver().id(ResourceKind::Zone, Requirement::Mandatory).await?;
            Ok(Args::new()
                .with("name", self.name.as_str())
                .with_opt("size", self.size)
                .with_opt("zoneid", zone))
        }

        fn present_call(&self, current: Option<&Value>, desired: &Args) -> Result<ApiCall> {
            let command = if current.is_some() { "updateWidget" } else { "createWidget" };
            Ok(ApiCall::new(command, desired.clone()).with_result_key("widget"))
        }

        fn absent_call(&self, current: &Value) -> Result<ApiCall> {
            Ok(ApiCall::new(
                "deleteWidget",
                Args::new().with("id", current["id"].clone()),
            ))
        }

        fn revert_call(&self, current: &Value) -> Result<ApiCall> {
            Ok(ApiCall::new(
                "revertWidget",
                Args::new().with("id", current["id"].clone()),
            ))
        }

        fn ready_state(&self) -> Option<(&'static str, &'static str)> {
            Some(("state", "Ready"))
        }

        fn returns(&self) -> &[(&'static str, &'static str)] {
            &[("size", "size")]
        }
    }

    fn widget(size: Option<u64>) -> Widget {
        Widget {
            name: "w1".to_string(),
            size,
        }
    }

    fn setup() -> (Arc<MockTransport>, Reconciler, ScopeContext) {
        let mock = Arc::new(MockTransport::new());
        mock.respond("listZones", json!({"count": 1, "zone": [{"id": "z-1", "name": "zone01"}]}));
        let reconciler = Reconciler::new(
            Gateway::new(mock.clone()),
            PollConfig::default().with_timeout(Duration::from_secs(10)),
        );
        (mock, reconciler, ScopeContext::new().with_zone("zone01"))
    }

    fn dry_run() -> RunOptions {
        RunOptions {
            dry_run: true,
            ..RunOptions::default()
        }
    }

    #[tokio::test]
    async fn test_present_updates_then_noop() {
        let (mock, reconciler, scope) = setup();
        mock.respond_once(
            "listWidgets",
            json!({"count": 1, "widget": [{"id": "w-1", "name": "w1", "size": "4"}]}),
        );
        mock.respond(
            "listWidgets",
            json!({"count": 1, "widget": [{"id": "w-1", "name": "w1", "size": "8"}]}),
        );
        mock.respond("updateWidget", json!({"widget": {"id": "w-1", "name": "w1", "size": "8"}}));

        let options = RunOptions {
            diff: true,
            ..RunOptions::default()
        };
        let first = reconciler
            .reconcile(&widget(Some(8)), &scope, options, TargetState::Present)
            .await
            .unwrap();
        assert!(first.changed);
        assert_eq!(first.get("size"), Some(&json!("8")));
        assert_eq!(first.get("zone"), Some(&json!("zone01")));
        let diff = first.diff.unwrap();
        assert_eq!(diff.before["size"], "4");
        assert_eq!(diff.after["size"], 8);

        let second = reconciler
            .reconcile(&widget(Some(8)), &scope, RunOptions::default(), TargetState::Present)
            .await
            .unwrap();
        assert!(!second.changed);
        assert_eq!(mock.count("updateWidget"), 1);
    }

    #[tokio::test]
    async fn test_present_creates_missing() {
        let (mock, reconciler, scope) = setup();
        mock.respond("listWidgets", json!({}));
        mock.respond("createWidget", json!({"jobid": "j-1"}));
        mock.respond(
            "queryAsyncJobResult",
            json!({"jobstatus": 1, "jobresult": {"widget": {"id": "w-9", "name": "w1"}}}),
        );

        let record = reconciler
            .reconcile(&widget(Some(2)), &scope, RunOptions::default(), TargetState::Present)
            .await
            .unwrap();

        assert!(record.changed);
        assert_eq!(record.get("id"), Some(&json!("w-9")));
        assert_eq!(mock.calls_to("createWidget")[0].get_str("zoneid"), Some("z-1"));
    }

    #[tokio::test]
    async fn test_present_without_polling_keeps_previous_object() {
        let (mock, reconciler, scope) = setup();
        mock.respond("listWidgets", json!({}));
        mock.respond("createWidget", json!({"jobid": "j-1"}));

        let options = RunOptions {
            poll_async: false,
            ..RunOptions::default()
        };
        let record = reconciler
            .reconcile(&widget(Some(2)), &scope, options, TargetState::Present)
            .await
            .unwrap();

        assert!(record.changed);
        assert!(record.get("id").is_none());
        assert_eq!(mock.count("queryAsyncJobResult"), 0);
    }

    #[tokio::test]
    async fn test_dry_run_issues_no_mutation() {
        let (mock, reconciler, scope) = setup();
        mock.respond("listWidgets", json!({"count": 1, "widget": [{"id": "w-1", "size": "4"}]}));

        let record = reconciler
            .reconcile(&widget(Some(8)), &scope, dry_run(), TargetState::Present)
            .await
            .unwrap();

        assert!(record.changed);
        assert_eq!(mock.commands(), vec!["listZones", "listWidgets"]);
    }

    #[tokio::test]
    async fn test_dry_run_still_surfaces_not_found() {
        let (mock, reconciler, _) = setup();
        mock.respond("listWidgets", json!({}));
        let scope = ScopeContext::new().with_zone("zone99");

        let err = reconciler
            .reconcile(&widget(Some(8)), &scope, dry_run(), TargetState::Present)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_value_is_noop() {
        let (mock, reconciler, scope) = setup();
        mock.respond("listWidgets", json!({"count": 1, "widget": [{"id": "w-1", "name": "w1"}]}));

        let record = reconciler
            .reconcile(&widget(None), &scope, RunOptions::default(), TargetState::Present)
            .await
            .unwrap();

        assert!(!record.changed);
        assert_eq!(mock.count("updateWidget"), 0);
        assert_eq!(mock.count("createWidget"), 0);
    }

    #[tokio::test]
    async fn test_absent_twice() {
        let (mock, reconciler, scope) = setup();
        mock.respond_once("listWidgets", json!({"count": 1, "widget": [{"id": "w-1", "name": "w1"}]}));
        mock.respond("listWidgets", json!({}));
        mock.respond("deleteWidget", json!({"success": true}));

        let first = reconciler
            .reconcile(&widget(None), &scope, RunOptions::default(), TargetState::Absent)
            .await
            .unwrap();
        assert!(first.changed);
        assert_eq!(first.get("id"), Some(&json!("w-1")));

        let second = reconciler
            .reconcile(&widget(None), &scope, RunOptions::default(), TargetState::Absent)
            .await
            .unwrap();
        assert!(!second.changed);
        assert_eq!(mock.count("deleteWidget"), 1);
    }

    #[tokio::test]
    async fn test_revert_requires_ready() {
        let (mock, reconciler, scope) = setup();
        mock.respond(
            "listWidgets",
            json!({"count": 1, "widget": [{"id": "w-1", "state": "Allocated"}]}),
        );

        let err = reconciler
            .reconcile(&widget(None), &scope, RunOptions::default(), TargetState::Revert)
            .await
            .unwrap_err();
        match err {
            ReconcileError::InvalidState { status, .. } => assert_eq!(status, "Allocated"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(mock.count("revertWidget"), 0);
    }

    #[tokio::test]
    async fn test_revert_missing_is_not_found() {
        let (mock, reconciler, scope) = setup();
        mock.respond("listWidgets", json!({}));

        let err = reconciler
            .reconcile(&widget(None), &scope, RunOptions::default(), TargetState::Revert)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_each_run_has_its_own_cache() {
        let (mock, reconciler, scope) = setup();
        mock.respond("listWidgets", json!({"count": 1, "widget": [{"id": "w-1", "size": "8"}]}));

        for _ in 0..2 {
            reconciler
                .reconcile(&widget(Some(8)), &scope, RunOptions::default(), TargetState::Present)
                .await
                .unwrap();
        }
        // fetch and desired args share one lookup per run
        assert_eq!(mock.count("listZones"), 2);
    }
}
