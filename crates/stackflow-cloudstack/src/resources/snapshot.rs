//! VM snapshots

use async_trait::async_trait;
use serde_json::Value;
use stackflow_api::Args;
use stackflow_cloud::{
    ApiCall, ManagedResource, Requirement, ResourceKind, Result, Run, Tag, TagSpec, TargetState,
};

#[derive(Debug, Clone, PartialEq)]
pub struct VmSnapshot {
    pub name: String,
    pub description: Option<String>,
    pub snapshot_memory: bool,

    /// `None` leaves existing tags alone
    pub tags: Option<Vec<Tag>>,
}

impl VmSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            snapshot_memory: false,
            tags: None,
        }
    }

    /// Zone is required even though the VM alone would identify the snapshot
    async fn vm_id(run: &mut Run<'_>) -> Result<Option<String>> {
        let resolver = run.resolver();
        resolver.resolve(ResourceKind::Zone, Requirement::Mandatory).await?;
        resolver.id(ResourceKind::VirtualMachine, Requirement::Mandatory).await
    }
}

fn snapshot_id(current: &Value) -> Value {
    current.get("id").cloned().unwrap_or(Value::Null)
}

#[async_trait]
impl ManagedResource for VmSnapshot {
    fn kind(&self) -> &str {
        "VM snapshot"
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn supported_states(&self) -> &[TargetState] {
        &[TargetState::Present, TargetState::Absent, TargetState::Revert]
    }

    async fn fetch_current(&self, run: &mut Run<'_>) -> Result<Option<Value>> {
        let vm = Self::vm_id(run).await?;
        let args = run
            .resolver()
            .owner_args()
            .await?
            .with_opt("virtualmachineid", vm)
            .with("name", self.name.as_str());

        let snapshots = run.gateway().list("listVMSnapshot", &args).await?;
        Ok(snapshots.into_iter().next())
    }

    async fn desired_args(&self, run: &mut Run<'_>) -> Result<Args> {
        let vm = Self::vm_id(run).await?;
        Ok(Args::new()
            .with_opt("virtualmachineid", vm)
            .with("name", self.name.as_str())
            .with_opt("description", self.description.as_deref())
            .with("snapshotmemory", self.snapshot_memory))
    }

    fn present_call(&self, _current: Option<&Value>, desired: &Args) -> Result<ApiCall> {
        Ok(ApiCall::new("createVMSnapshot", desired.clone()).with_result_key("vmsnapshot"))
    }

    fn absent_call(&self, current: &Value) -> Result<ApiCall> {
        let args = Args::new().with("vmsnapshotid", snapshot_id(current));
        Ok(ApiCall::new("deleteVMSnapshot", args).with_result_key("vmsnapshot"))
    }

    fn revert_call(&self, current: &Value) -> Result<ApiCall> {
        let args = Args::new().with("vmsnapshotid", snapshot_id(current));
        Ok(ApiCall::new("revertToVMSnapshot", args).with_result_key("vmsnapshot"))
    }

    fn ready_state(&self) -> Option<(&'static str, &'static str)> {
        Some(("state", "Ready"))
    }

    fn returns(&self) -> &[(&'static str, &'static str)] {
        &[("type", "type"), ("current", "current")]
    }

    fn tags(&self) -> Option<TagSpec> {
        self.tags.as_ref().map(|tags| TagSpec {
            resource_type: "Snapshot".to_string(),
            tags: tags.clone(),
        })
    }
}
