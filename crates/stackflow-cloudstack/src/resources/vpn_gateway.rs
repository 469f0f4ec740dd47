//! Site-to-site VPN gateways of a VPC

use async_trait::async_trait;
use serde_json::Value;
use stackflow_api::Args;
use stackflow_cloud::{ApiCall, ManagedResource, Requirement, ResourceKind, Result, Run};

/// The VPN gateway of one VPC. A VPC has at most one, so the VPC name is
/// its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct VpnGateway {
    pub vpc: String,
}

impl VpnGateway {
    pub fn new(vpc: impl Into<String>) -> Self {
        Self { vpc: vpc.into() }
    }

    async fn owner_args(run: &mut Run<'_>) -> Result<Args> {
        let resolver = run.resolver();
        resolver.resolve(ResourceKind::Zone, Requirement::Mandatory).await?;
        let vpc = resolver.id(ResourceKind::Vpc, Requirement::Mandatory).await?;
        Ok(resolver.owner_args().await?.with_opt("vpcid", vpc))
    }
}

#[async_trait]
impl ManagedResource for VpnGateway {
    fn kind(&self) -> &str {
        "VPN gateway"
    }

    fn name(&self) -> String {
        self.vpc.clone()
    }

    async fn fetch_current(&self, run: &mut Run<'_>) -> Result<Option<Value>> {
        let args = Self::owner_args(run).await?;
        let gateways = run.gateway().list("listVpnGateways", &args).await?;
        Ok(gateways.into_iter().next())
    }

    async fn desired_args(&self, run: &mut Run<'_>) -> Result<Args> {
        Self::owner_args(run).await
    }

    fn present_call(&self, _current: Option<&Value>, desired: &Args) -> Result<ApiCall> {
        Ok(ApiCall::new("createVpnGateway", desired.clone()).with_result_key("vpngateway"))
    }

    fn absent_call(&self, current: &Value) -> Result<ApiCall> {
        let args = Args::new().with("id", current.get("id").cloned().unwrap_or(Value::Null));
        Ok(ApiCall::new("deleteVpnGateway", args).with_result_key("vpngateway"))
    }

    fn returns(&self) -> &[(&'static str, &'static str)] {
        &[("publicip", "public_ip")]
    }
}
