//! Scope model: which remote objects a name may refer to

use serde::{Deserialize, Serialize};

/// Kinds of remote objects the resolver can look up by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Domain,
    Account,
    Project,
    Zone,
    Vpc,
    Network,
    Cluster,
    StoragePool,
    VirtualMachine,
    Nic,
}

impl ResourceKind {
    /// Key under which the resolved name is reported in output records
    pub fn output_key(&self) -> &'static str {
        match self {
            ResourceKind::Domain => "domain",
            ResourceKind::Account => "account",
            ResourceKind::Project => "project",
            ResourceKind::Zone => "zone",
            ResourceKind::Vpc => "vpc",
            ResourceKind::Network => "network",
            ResourceKind::Cluster => "cluster",
            ResourceKind::StoragePool => "storage",
            ResourceKind::VirtualMachine => "vm",
            ResourceKind::Nic => "nic",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Domain => write!(f, "domain"),
            ResourceKind::Account => write!(f, "account"),
            ResourceKind::Project => write!(f, "project"),
            ResourceKind::Zone => write!(f, "zone"),
            ResourceKind::Vpc => write!(f, "VPC"),
            ResourceKind::Network => write!(f, "network"),
            ResourceKind::Cluster => write!(f, "cluster"),
            ResourceKind::StoragePool => write!(f, "storage pool"),
            ResourceKind::VirtualMachine => write!(f, "virtual machine"),
            ResourceKind::Nic => write!(f, "NIC"),
        }
    }
}

/// Whether a scope must be given by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Unset means "no constraint"
    Optional,
    /// Unset is an error
    Mandatory,
}

/// Scope references of one desired-state record. Immutable for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeContext {
    pub domain: Option<String>,
    pub account: Option<String>,
    pub project: Option<String>,
    pub zone: Option<String>,
    pub vpc: Option<String>,
    pub network: Option<String>,
    pub cluster: Option<String>,
    pub storage_pool: Option<String>,
    pub vm: Option<String>,
}

impl ScopeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, name: impl Into<String>) -> Self {
        self.domain = Some(name.into());
        self
    }

    pub fn with_account(mut self, name: impl Into<String>) -> Self {
        self.account = Some(name.into());
        self
    }

    pub fn with_project(mut self, name: impl Into<String>) -> Self {
        self.project = Some(name.into());
        self
    }

    pub fn with_zone(mut self, name: impl Into<String>) -> Self {
        self.zone = Some(name.into());
        self
    }

    pub fn with_vpc(mut self, name: impl Into<String>) -> Self {
        self.vpc = Some(name.into());
        self
    }

    pub fn with_network(mut self, name: impl Into<String>) -> Self {
        self.network = Some(name.into());
        self
    }

    pub fn with_cluster(mut self, name: impl Into<String>) -> Self {
        self.cluster = Some(name.into());
        self
    }

    pub fn with_storage_pool(mut self, name: impl Into<String>) -> Self {
        self.storage_pool = Some(name.into());
        self
    }

    pub fn with_vm(mut self, name: impl Into<String>) -> Self {
        self.vm = Some(name.into());
        self
    }

    /// Name given for `kind`; empty strings count as unset
    pub fn name(&self, kind: ResourceKind) -> Option<&str> {
        let name = match kind {
            ResourceKind::Domain => &self.domain,
            ResourceKind::Account => &self.account,
            ResourceKind::Project => &self.project,
            ResourceKind::Zone => &self.zone,
            ResourceKind::Vpc => &self.vpc,
            ResourceKind::Network => &self.network,
            ResourceKind::Cluster => &self.cluster,
            ResourceKind::StoragePool => &self.storage_pool,
            ResourceKind::VirtualMachine => &self.vm,
            ResourceKind::Nic => return None,
        };
        name.as_deref().filter(|n| !n.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_is_unset() {
        let scope = ScopeContext::new().with_zone("").with_cluster("cluster01");
        assert_eq!(scope.name(ResourceKind::Zone), None);
        assert_eq!(scope.name(ResourceKind::Cluster), Some("cluster01"));
        assert_eq!(scope.name(ResourceKind::Nic), None);
    }
}
