//! Scoped name resolution with a per-run cache
//!
//! A [`Resolver`] turns the human-readable names of a [`ScopeContext`] into
//! the remote objects they refer to. Parents are resolved before children
//! (domain before account, account/project/zone before VPC and VM, VM and
//! network before NIC) so that each listing can be filtered by the parent
//! ids. Each kind is looked up at most once per resolver; the resolver is
//! owned by a single run and dropped with it.

use crate::error::{ReconcileError, Result};
use crate::scope::{Requirement, ResourceKind, ScopeContext};
use serde_json::Value;
use stackflow_api::args::scalar_text;
use stackflow_api::{Args, Gateway};
use std::collections::HashMap;

/// Order in which resolved scope names are reported
const REPORT_ORDER: [ResourceKind; 9] = [
    ResourceKind::Domain,
    ResourceKind::Account,
    ResourceKind::Project,
    ResourceKind::Zone,
    ResourceKind::Vpc,
    ResourceKind::Network,
    ResourceKind::Cluster,
    ResourceKind::StoragePool,
    ResourceKind::VirtualMachine,
];

pub struct Resolver<'a> {
    gateway: &'a Gateway,
    scope: &'a ScopeContext,
    cache: HashMap<ResourceKind, Value>,
}

impl<'a> Resolver<'a> {
    pub fn new(gateway: &'a Gateway, scope: &'a ScopeContext) -> Self {
        Self {
            gateway,
            scope,
            cache: HashMap::new(),
        }
    }

    pub fn scope(&self) -> &ScopeContext {
        self.scope
    }

    /// Already-resolved object of `kind`, without any remote call
    pub fn cached(&self, kind: ResourceKind) -> Option<&Value> {
        self.cache.get(&kind)
    }

    /// Resolve `kind` from the scope context
    ///
    /// Returns `Ok(None)` only for an optional scope the caller left unset.
    /// A name that was given but matches nothing is always an error.
    pub async fn resolve(
        &mut self,
        kind: ResourceKind,
        requirement: Requirement,
    ) -> Result<Option<Value>> {
        match kind {
            ResourceKind::Domain => self.domain(requirement).await,
            ResourceKind::Account => self.account(requirement).await,
            ResourceKind::Project => self.project(requirement).await,
            ResourceKind::Zone => self.zone(requirement).await,
            ResourceKind::Vpc => self.vpc(requirement).await,
            ResourceKind::Network => self.network(requirement).await,
            ResourceKind::Cluster => {
                self.by_name(ResourceKind::Cluster, requirement, "listClusters")
                    .await
            }
            ResourceKind::StoragePool => {
                self.by_name(ResourceKind::StoragePool, requirement, "listStoragePools")
                    .await
            }
            ResourceKind::VirtualMachine => self.vm(requirement).await,
            ResourceKind::Nic => self.nic().await.map(Some),
        }
    }

    /// `id` of the resolved object
    pub async fn id(
        &mut self,
        kind: ResourceKind,
        requirement: Requirement,
    ) -> Result<Option<String>> {
        self.field(kind, requirement, "id").await
    }

    /// `name` of the resolved object (some commands filter by account name)
    pub async fn name(
        &mut self,
        kind: ResourceKind,
        requirement: Requirement,
    ) -> Result<Option<String>> {
        self.field(kind, requirement, "name").await
    }

    pub async fn field(
        &mut self,
        kind: ResourceKind,
        requirement: Requirement,
        field: &str,
    ) -> Result<Option<String>> {
        let object = self.resolve(kind, requirement).await?;
        Ok(field_of(object.as_ref(), field))
    }

    /// Human-readable names of everything resolved so far, keyed by the
    /// output field they are reported under. Domains report their path.
    pub fn scope_names(&self) -> Vec<(&'static str, String)> {
        REPORT_ORDER
            .iter()
            .filter_map(|kind| {
                let object = self.cache.get(kind)?;
                let field = if *kind == ResourceKind::Domain { "path" } else { "name" };
                object
                    .get(field)
                    .map(|v| (kind.output_key(), scalar_text(v)))
            })
            .collect()
    }

    /// Account name, domain id and project id: the owner filter most
    /// listing commands accept
    pub async fn owner_args(&mut self) -> Result<Args> {
        let account = self.account(Requirement::Optional).await?;
        let domain = self.domain(Requirement::Optional).await?;
        let project = self.project(Requirement::Optional).await?;

        Ok(Args::new()
            .with_opt("account", field_of(account.as_ref(), "name"))
            .with_opt("domainid", field_of(domain.as_ref(), "id"))
            .with_opt("projectid", field_of(project.as_ref(), "id")))
    }

    fn hit(&self, kind: ResourceKind) -> Option<Value> {
        let hit = self.cache.get(&kind).cloned();
        if hit.is_some() {
            tracing::debug!("Resolver cache hit: {}", kind);
        }
        hit
    }

    fn requested(&self, kind: ResourceKind, requirement: Requirement) -> Result<Option<String>> {
        match (self.scope.name(kind), requirement) {
            (Some(name), _) => Ok(Some(name.to_string())),
            (None, Requirement::Optional) => Ok(None),
            (None, Requirement::Mandatory) => Err(ReconcileError::MissingScope {
                kind: kind.to_string(),
            }),
        }
    }

    fn remember(&mut self, kind: ResourceKind, object: Value) -> Option<Value> {
        self.cache.insert(kind, object.clone());
        Some(object)
    }

    async fn find(
        &self,
        kind: ResourceKind,
        command: &str,
        args: &Args,
        fields: &[&str],
        name: &str,
    ) -> Result<Value> {
        let items = self.gateway.list(command, args).await?;
        select_first(kind, items, |o| matches_name(o, fields, name), name)
    }

    async fn domain(&mut self, requirement: Requirement) -> Result<Option<Value>> {
        if let Some(hit) = self.hit(ResourceKind::Domain) {
            return Ok(Some(hit));
        }
        let Some(name) = self.requested(ResourceKind::Domain, requirement)? else {
            return Ok(None);
        };

        let items = self
            .gateway
            .list("listDomains", &Args::new().with("listall", true))
            .await?;

        let wanted = name.to_lowercase();
        let candidates = [
            wanted.clone(),
            format!("root/{}", wanted),
            format!("root{}", wanted),
        ];
        let domain = select_first(
            ResourceKind::Domain,
            items,
            |d| {
                d.get("path")
                    .and_then(Value::as_str)
                    .is_some_and(|p| candidates.contains(&p.to_lowercase()))
            },
            &name,
        )?;

        Ok(self.remember(ResourceKind::Domain, domain))
    }

    async fn account(&mut self, requirement: Requirement) -> Result<Option<Value>> {
        if let Some(hit) = self.hit(ResourceKind::Account) {
            return Ok(Some(hit));
        }
        let Some(name) = self.requested(ResourceKind::Account, requirement)? else {
            return Ok(None);
        };

        if self.scope.name(ResourceKind::Domain).is_none() {
            return Err(ReconcileError::invalid_argument(
                "account must be specified with domain",
            ));
        }
        let domain = self.domain(Requirement::Mandatory).await?;

        let args = Args::new()
            .with("name", name.as_str())
            .with_opt("domainid", field_of(domain.as_ref(), "id"))
            .with("listall", true);
        let account = self
            .find(ResourceKind::Account, "listAccounts", &args, &["name"], &name)
            .await?;

        Ok(self.remember(ResourceKind::Account, account))
    }

    async fn project(&mut self, requirement: Requirement) -> Result<Option<Value>> {
        if let Some(hit) = self.hit(ResourceKind::Project) {
            return Ok(Some(hit));
        }
        let Some(name) = self.requested(ResourceKind::Project, requirement)? else {
            return Ok(None);
        };

        let account = self.account(Requirement::Optional).await?;
        let domain = self.domain(Requirement::Optional).await?;
        let args = Args::new()
            .with_opt("account", field_of(account.as_ref(), "name"))
            .with_opt("domainid", field_of(domain.as_ref(), "id"))
            .with("listall", true);
        let project = self
            .find(ResourceKind::Project, "listProjects", &args, &["name"], &name)
            .await?;

        Ok(self.remember(ResourceKind::Project, project))
    }

    async fn zone(&mut self, requirement: Requirement) -> Result<Option<Value>> {
        if let Some(hit) = self.hit(ResourceKind::Zone) {
            return Ok(Some(hit));
        }
        let Some(name) = self.requested(ResourceKind::Zone, requirement)? else {
            return Ok(None);
        };

        let zone = self
            .find(ResourceKind::Zone, "listZones", &Args::new(), &["name"], &name)
            .await?;

        Ok(self.remember(ResourceKind::Zone, zone))
    }

    async fn vpc(&mut self, requirement: Requirement) -> Result<Option<Value>> {
        if let Some(hit) = self.hit(ResourceKind::Vpc) {
            return Ok(Some(hit));
        }
        let Some(name) = self.requested(ResourceKind::Vpc, requirement)? else {
            return Ok(None);
        };

        let zone = self.zone(Requirement::Optional).await?;
        let args = self
            .owner_args()
            .await?
            .with_opt("zoneid", field_of(zone.as_ref(), "id"));
        let vpc = self
            .find(
                ResourceKind::Vpc,
                "listVPCs",
                &args,
                &["name", "displaytext"],
                &name,
            )
            .await?;

        Ok(self.remember(ResourceKind::Vpc, vpc))
    }

    async fn network(&mut self, requirement: Requirement) -> Result<Option<Value>> {
        if let Some(hit) = self.hit(ResourceKind::Network) {
            return Ok(Some(hit));
        }
        let name = match self.requested(ResourceKind::Network, requirement)? {
            Some(name) => name,
            None => {
                if let Some(vpc) = self.scope.name(ResourceKind::Vpc) {
                    return Err(ReconcileError::invalid_argument(format!(
                        "could not find network for VPC '{}' due to missing argument: network",
                        vpc
                    )));
                }
                return Ok(None);
            }
        };

        let zone = self.zone(Requirement::Optional).await?;
        let vpc_id = field_of(self.vpc(Requirement::Optional).await?.as_ref(), "id");
        let args = self
            .owner_args()
            .await?
            .with_opt("zoneid", field_of(zone.as_ref(), "id"))
            .with_opt("vpcid", vpc_id.clone());

        let items = self.gateway.list("listNetworks", &args).await?;
        let network = select_first(
            ResourceKind::Network,
            items,
            |n| {
                // VPC tiers only count when a VPC was asked for
                if vpc_id.is_none() && n.get("vpcid").is_some_and(|v| !v.is_null()) {
                    return false;
                }
                matches_name(n, &["name", "displaytext"], &name)
            },
            &name,
        )?;

        Ok(self.remember(ResourceKind::Network, network))
    }

    async fn vm(&mut self, requirement: Requirement) -> Result<Option<Value>> {
        if let Some(hit) = self.hit(ResourceKind::VirtualMachine) {
            return Ok(Some(hit));
        }
        let Some(name) = self.requested(ResourceKind::VirtualMachine, requirement)? else {
            return Ok(None);
        };

        let zone = self.zone(Requirement::Optional).await?;
        let args = self
            .owner_args()
            .await?
            .with_opt("zoneid", field_of(zone.as_ref(), "id"));
        let vm = self
            .find(
                ResourceKind::VirtualMachine,
                "listVirtualMachines",
                &args,
                &["name", "displayname"],
                &name,
            )
            .await?;

        Ok(self.remember(ResourceKind::VirtualMachine, vm))
    }

    async fn by_name(
        &mut self,
        kind: ResourceKind,
        requirement: Requirement,
        command: &str,
    ) -> Result<Option<Value>> {
        if let Some(hit) = self.hit(kind) {
            return Ok(Some(hit));
        }
        let Some(name) = self.requested(kind, requirement)? else {
            return Ok(None);
        };

        let args = Args::new().with("name", name.as_str());
        let object = self.find(kind, command, &args, &["name"], &name).await?;

        Ok(self.remember(kind, object))
    }

    /// NIC of the scope's VM, on the scope's network when one is given
    async fn nic(&mut self) -> Result<Value> {
        if let Some(hit) = self.hit(ResourceKind::Nic) {
            return Ok(hit);
        }
        let vm = self.vm(Requirement::Mandatory).await?;
        let network = self.network(Requirement::Optional).await?;

        let args = Args::new()
            .with_opt("virtualmachineid", field_of(vm.as_ref(), "id"))
            .with_opt("networkid", field_of(network.as_ref(), "id"));
        let nics = self.gateway.list("listNics", &args).await?;

        let Some(nic) = nics.into_iter().next() else {
            let vm_name = field_of(vm.as_ref(), "name").unwrap_or_default();
            let network_name =
                field_of(network.as_ref(), "name").unwrap_or_else(|| "default".to_string());
            return Err(ReconcileError::not_found(
                "NIC",
                format!("for VM {} in network {}", vm_name, network_name),
            ));
        };

        self.cache.insert(ResourceKind::Nic, nic.clone());
        Ok(nic)
    }
}

fn field_of(object: Option<&Value>, field: &str) -> Option<String> {
    object.and_then(|o| o.get(field)).map(scalar_text)
}

/// First element satisfying `predicate`. Further matches are ignored;
/// they are only logged.
fn select_first(
    kind: ResourceKind,
    items: Vec<Value>,
    predicate: impl Fn(&Value) -> bool,
    name: &str,
) -> Result<Value> {
    let mut matching = items.into_iter().filter(|o| predicate(o));
    let first = matching
        .next()
        .ok_or_else(|| ReconcileError::not_found(kind.to_string(), name))?;

    let others = matching.count();
    if others > 0 {
        tracing::debug!(
            "{} '{}' matched {} objects, using the first one",
            kind,
            name,
            others + 1
        );
    }
    Ok(first)
}

/// Case-insensitive match on any of `fields`, or exact match on `id`
fn matches_name(object: &Value, fields: &[&str], name: &str) -> bool {
    if object.get("id").map(scalar_text).as_deref() == Some(name) {
        return true;
    }
    fields.iter().any(|field| {
        object
            .get(*field)
            .and_then(Value::as_str)
            .is_some_and(|v| v.eq_ignore_ascii_case(name))
    })
}
