//! Secondary IP addresses on a VM's NIC

use async_trait::async_trait;
use serde_json::{Map, Value};
use stackflow_api::Args;
use stackflow_api::args::scalar_text;
use stackflow_cloud::projector;
use stackflow_cloud::{ApiCall, ManagedResource, Requirement, ResourceKind, Result, Run};

/// A secondary IP on the NIC of `vm` in the scope's network (or the VM's
/// default NIC)
///
/// Without `vm_guest_ip` the API picks a free address, so every `present`
/// run adds another one.
#[derive(Debug, Clone, PartialEq)]
pub struct NicSecondaryIp {
    pub vm: String,
    pub vm_guest_ip: Option<String>,
}

impl NicSecondaryIp {
    pub fn new(vm: impl Into<String>, vm_guest_ip: Option<String>) -> Self {
        Self {
            vm: vm.into(),
            vm_guest_ip,
        }
    }

    async fn nic(run: &mut Run<'_>) -> Result<Value> {
        let resolver = run.resolver();
        resolver.resolve(ResourceKind::Zone, Requirement::Mandatory).await?;
        resolver
            .resolve(ResourceKind::Nic, Requirement::Mandatory)
            .await
            .map(Option::unwrap_or_default)
    }
}

#[async_trait]
impl ManagedResource for NicSecondaryIp {
    fn kind(&self) -> &str {
        "NIC secondary IP"
    }

    fn name(&self) -> String {
        match &self.vm_guest_ip {
            Some(ip) => format!("{} on {}", ip, self.vm),
            None => format!("new IP on {}", self.vm),
        }
    }

    async fn fetch_current(&self, run: &mut Run<'_>) -> Result<Option<Value>> {
        let nic = Self::nic(run).await?;
        let Some(wanted) = self.vm_guest_ip.as_deref() else {
            return Ok(None);
        };

        Ok(nic
            .get("secondaryip")
            .and_then(Value::as_array)
            .and_then(|ips| {
                ips.iter()
                    .find(|ip| ip.get("ipaddress").and_then(Value::as_str) == Some(wanted))
                    .cloned()
            }))
    }

    async fn desired_args(&self, run: &mut Run<'_>) -> Result<Args> {
        let nic = Self::nic(run).await?;
        if self.vm_guest_ip.is_none() {
            tracing::warn!(
                "No vm_guest_ip given for {}: a new secondary IP is added on every run",
                self.vm
            );
        }
        Ok(Args::new()
            .with_opt("nicid", nic.get("id").cloned())
            .with_opt("ipaddress", self.vm_guest_ip.as_deref()))
    }

    fn present_call(&self, _current: Option<&Value>, desired: &Args) -> Result<ApiCall> {
        Ok(ApiCall::new("addIpToNic", desired.clone()).with_result_key("nicsecondaryip"))
    }

    fn absent_call(&self, current: &Value) -> Result<ApiCall> {
        let args = Args::new().with("id", current.get("id").cloned().unwrap_or(Value::Null));
        Ok(ApiCall::new("removeIpFromNic", args).with_result_key("nicsecondaryip"))
    }

    fn returns(&self) -> &[(&'static str, &'static str)] {
        &[
            ("ipaddress", "ip_address"),
            ("macaddress", "mac_address"),
            ("netmask", "netmask"),
        ]
    }

    /// Projected from the NIC; the secondary IP itself only contributes
    /// `vm_guest_ip`
    async fn project(
        &self,
        run: &mut Run<'_>,
        resource: Option<&Value>,
    ) -> Result<Map<String, Value>> {
        let nic = run.resolver().cached(ResourceKind::Nic).cloned();
        let mut fields = projector::project(nic.as_ref(), self.returns(), &run.scope_names());

        if !fields.contains_key("network") {
            if let Some(network) = nic.as_ref().and_then(|n| n.get("networkname")) {
                fields.insert("network".to_string(), network.clone());
            }
        }

        let guest_ip = resource
            .and_then(|r| r.get("ipaddress"))
            .map(scalar_text)
            .or_else(|| self.vm_guest_ip.clone());
        fields.insert(
            "vm_guest_ip".to_string(),
            guest_ip.map(Value::String).unwrap_or(Value::Null),
        );

        Ok(fields)
    }
}
