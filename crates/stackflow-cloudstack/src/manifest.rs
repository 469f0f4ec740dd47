//! Desired-state manifest
//!
//! A manifest is a YAML (or JSON) document listing resources in the order
//! they are reconciled:
//!
//! ```yaml
//! resources:
//!   - kind: configuration
//!     name: limit.cpu
//!     value: 8
//!     zone: zone01
//!   - kind: instance_snapshot
//!     name: before-upgrade
//!     vm: web-01
//!     zone: zone01
//!     state: revert
//! ```

use crate::error::{ManifestError, Result};
use crate::resources::{Configuration, NicSecondaryIp, VmSnapshot, VpnGateway};
use serde::Deserialize;
use serde_json::Value;
use stackflow_cloud::{ManagedResource, ScopeContext, Tag, TargetState};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind")]
pub enum ResourceSpec {
    #[serde(rename = "configuration")]
    Configuration(ConfigurationSpec),
    #[serde(rename = "instance_snapshot")]
    InstanceSnapshot(InstanceSnapshotSpec),
    #[serde(rename = "vpn_gateway")]
    VpnGateway(VpnGatewaySpec),
    #[serde(rename = "instance_nic_secondaryip")]
    NicSecondaryIp(NicSecondaryIpSpec),
}

fn default_poll_async() -> bool {
    true
}

fn default_domain() -> String {
    "ROOT".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfigurationSpec {
    pub name: String,
    pub value: Value,
    pub zone: Option<String>,
    pub storage: Option<String>,
    pub cluster: Option<String>,
    pub account: Option<String>,
    /// Only considered together with `account`
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default)]
    pub state: TargetState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceSnapshotSpec {
    #[serde(alias = "display_name")]
    pub name: String,
    pub vm: String,
    pub description: Option<String>,
    pub zone: String,
    #[serde(default)]
    pub snapshot_memory: bool,
    pub domain: Option<String>,
    pub account: Option<String>,
    pub project: Option<String>,
    #[serde(alias = "tag")]
    pub tags: Option<Vec<Tag>>,
    #[serde(default)]
    pub state: TargetState,
    #[serde(default = "default_poll_async")]
    pub poll_async: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VpnGatewaySpec {
    pub vpc: String,
    pub zone: String,
    pub domain: Option<String>,
    pub account: Option<String>,
    pub project: Option<String>,
    #[serde(default)]
    pub state: TargetState,
    #[serde(default = "default_poll_async")]
    pub poll_async: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NicSecondaryIpSpec {
    #[serde(alias = "name")]
    pub vm: String,
    #[serde(alias = "secondary_ip")]
    pub vm_guest_ip: Option<String>,
    pub network: Option<String>,
    pub vpc: Option<String>,
    pub zone: String,
    pub domain: Option<String>,
    pub account: Option<String>,
    pub project: Option<String>,
    #[serde(default)]
    pub state: TargetState,
    #[serde(default = "default_poll_async")]
    pub poll_async: bool,
}

/// One validated manifest entry, ready for the reconciler
pub struct Entry {
    pub kind: &'static str,
    pub scope: ScopeContext,
    pub resource: Box<dyn ManagedResource>,
    pub state: TargetState,
    pub poll_async: bool,
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("kind", &self.kind)
            .field("name", &self.resource.name())
            .field("scope", &self.scope)
            .field("state", &self.state)
            .field("poll_async", &self.poll_async)
            .finish()
    }
}

impl Manifest {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("Loading manifest: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Validate every resource and convert it, stopping at the first
    /// invalid one
    pub fn entries(self) -> Result<Vec<Entry>> {
        self.resources
            .into_iter()
            .enumerate()
            .map(|(index, spec)| spec.into_entry(index))
            .collect()
    }
}

impl ResourceSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceSpec::Configuration(_) => "configuration",
            ResourceSpec::InstanceSnapshot(_) => "instance_snapshot",
            ResourceSpec::VpnGateway(_) => "vpn_gateway",
            ResourceSpec::NicSecondaryIp(_) => "instance_nic_secondaryip",
        }
    }

    fn allowed_states(&self) -> &'static [TargetState] {
        match self {
            ResourceSpec::Configuration(_) => &[TargetState::Present],
            ResourceSpec::InstanceSnapshot(_) => {
                &[TargetState::Present, TargetState::Absent, TargetState::Revert]
            }
            ResourceSpec::VpnGateway(_) | ResourceSpec::NicSecondaryIp(_) => {
                &[TargetState::Present, TargetState::Absent]
            }
        }
    }

    fn state(&self) -> TargetState {
        match self {
            ResourceSpec::Configuration(s) => s.state,
            ResourceSpec::InstanceSnapshot(s) => s.state,
            ResourceSpec::VpnGateway(s) => s.state,
            ResourceSpec::NicSecondaryIp(s) => s.state,
        }
    }

    pub fn into_entry(self, index: usize) -> Result<Entry> {
        let kind = self.kind();
        let invalid = |message: String| ManifestError::Invalid {
            index,
            kind: kind.to_string(),
            message,
        };

        let state = self.state();
        if !self.allowed_states().contains(&state) {
            return Err(invalid(format!("state '{}' is not supported", state)));
        }

        let entry = match self {
            ResourceSpec::Configuration(spec) => {
                required(&spec.name, "name").map_err(invalid)?;
                let scope = ScopeContext {
                    domain: Some(spec.domain),
                    account: spec.account,
                    zone: spec.zone,
                    cluster: spec.cluster,
                    storage_pool: spec.storage,
                    ..ScopeContext::default()
                };
                Entry {
                    kind,
                    scope,
                    resource: Box::new(Configuration::new(spec.name, &spec.value)),
                    state,
                    poll_async: true,
                }
            }
            ResourceSpec::InstanceSnapshot(spec) => {
                required(&spec.name, "name").map_err(invalid)?;
                required(&spec.vm, "vm").map_err(invalid)?;
                required(&spec.zone, "zone").map_err(invalid)?;
                let scope = ScopeContext {
                    domain: spec.domain,
                    account: spec.account,
                    project: spec.project,
                    zone: Some(spec.zone),
                    vm: Some(spec.vm),
                    ..ScopeContext::default()
                };
                let resource = VmSnapshot {
                    name: spec.name,
                    description: spec.description,
                    snapshot_memory: spec.snapshot_memory,
                    tags: spec.tags,
                };
                Entry {
                    kind,
                    scope,
                    resource: Box::new(resource),
                    state,
                    poll_async: spec.poll_async,
                }
            }
            ResourceSpec::VpnGateway(spec) => {
                required(&spec.vpc, "vpc").map_err(invalid)?;
                required(&spec.zone, "zone").map_err(invalid)?;
                let scope = ScopeContext {
                    domain: spec.domain,
                    account: spec.account,
                    project: spec.project,
                    zone: Some(spec.zone),
                    vpc: Some(spec.vpc.clone()),
                    ..ScopeContext::default()
                };
                Entry {
                    kind,
                    scope,
                    resource: Box::new(VpnGateway::new(spec.vpc)),
                    state,
                    poll_async: spec.poll_async,
                }
            }
            ResourceSpec::NicSecondaryIp(spec) => {
                required(&spec.vm, "vm").map_err(invalid)?;
                required(&spec.zone, "zone").map_err(invalid)?;
                if state == TargetState::Absent && spec.vm_guest_ip.is_none() {
                    return Err(invalid("state is absent but vm_guest_ip is missing".to_string()));
                }
                let scope = ScopeContext {
                    domain: spec.domain,
                    account: spec.account,
                    project: spec.project,
                    zone: Some(spec.zone),
                    vpc: spec.vpc,
                    network: spec.network,
                    vm: Some(spec.vm.clone()),
                    ..ScopeContext::default()
                };
                Entry {
                    kind,
                    scope,
                    resource: Box::new(NicSecondaryIp::new(spec.vm, spec.vm_guest_ip)),
                    state,
                    poll_async: spec.poll_async,
                }
            }
        };

        Ok(entry)
    }
}

fn required(value: &str, field: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("missing required argument: {}", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_and_aliases() {
        let yaml = r#"
resources:
  - kind: configuration
    name: router.reboot.when.outofband.migrated
    value: false
  - kind: instance_snapshot
    display_name: before-upgrade
    vm: web-01
    zone: zone01
    tag:
      - key: env
        value: prod
  - kind: instance_nic_secondaryip
    name: web-01
    secondary_ip: 10.1.1.20
    zone: zone01
    state: absent
    poll_async: false
"#;
        let manifest = Manifest::from_yaml(yaml).unwrap();
        assert_eq!(manifest.resources.len(), 3);

        match &manifest.resources[0] {
            ResourceSpec::Configuration(spec) => {
                assert_eq!(spec.domain, "ROOT");
                assert_eq!(spec.state, TargetState::Present);
                assert_eq!(spec.value, Value::Bool(false));
            }
            other => panic!("unexpected resource: {:?}", other),
        }
        match &manifest.resources[1] {
            ResourceSpec::InstanceSnapshot(spec) => {
                assert_eq!(spec.name, "before-upgrade");
                assert!(spec.poll_async);
                assert_eq!(spec.tags, Some(vec![Tag::new("env", "prod")]));
            }
            other => panic!("unexpected resource: {:?}", other),
        }
        match &manifest.resources[2] {
            ResourceSpec::NicSecondaryIp(spec) => {
                assert_eq!(spec.vm, "web-01");
                assert_eq!(spec.vm_guest_ip.as_deref(), Some("10.1.1.20"));
                assert_eq!(spec.state, TargetState::Absent);
                assert!(!spec.poll_async);
            }
            other => panic!("unexpected resource: {:?}", other),
        }

        let entries = manifest.entries().unwrap();
        assert_eq!(entries[0].scope.domain.as_deref(), Some("ROOT"));
        assert_eq!(entries[1].scope.vm.as_deref(), Some("web-01"));
        assert_eq!(entries[1].resource.name(), "before-upgrade");
        assert!(!entries[2].poll_async);
    }

    #[test]
    fn test_unsupported_state_rejected() {
        let yaml = r#"
resources:
  - kind: vpn_gateway
    vpc: my VPC
    zone: zone01
    state: revert
"#;
        let err = Manifest::from_yaml(yaml).unwrap().entries().unwrap_err();
        match err {
            ManifestError::Invalid { index, kind, .. } => {
                assert_eq!(index, 0);
                assert_eq!(kind, "vpn_gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_absent_secondary_ip_requires_address() {
        let yaml = r#"
resources:
  - kind: instance_nic_secondaryip
    vm: web-01
    zone: zone01
    state: absent
"#;
        let err = Manifest::from_yaml(yaml).unwrap().entries().unwrap_err();
        assert!(err.to_string().contains("vm_guest_ip"));
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let yaml = "resources:\n  - kind: load_balancer\n    name: lb\n";
        assert!(matches!(
            Manifest::from_yaml(yaml),
            Err(ManifestError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_required_field() {
        let yaml = "resources:\n  - kind: vpn_gateway\n    vpc: \"\"\n    zone: zone01\n";
        let err = Manifest::from_yaml(yaml).unwrap().entries().unwrap_err();
        assert!(err.to_string().contains("missing required argument: vpc"));
    }
}
