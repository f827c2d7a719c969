//! Resource kinds.
//!
//! Every supported Intersight object is described by a
//! [`ResourceDefinition`]: its collection path, how its natural key is
//! scoped and its declared parameters. Table-driven kinds go through one
//! generic module; server profile templates and fabric port policies add
//! their own steps around it.

mod catalog;
mod policy;
mod port_policy;
mod profile_template;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::config::{DesiredState, ResourceConfig};
use crate::engine::{check_params, FieldSpec, Locator, Normalizer};
use crate::error::Result;
use crate::intersight::{IntersightApi, RemoteResource};
use crate::reconciler::{ReconcileOutcome, Reconciler};

pub use port_policy::PortPolicyLayout;

/// Supported resource kinds, named as in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// MAC address pool.
    MacPool,
    /// WWNN/WWPN pool.
    #[serde(alias = "fibre_channel_pool")]
    FcPool,
    /// IP address pool.
    IpPool,
    /// iSCSI adapter policy.
    IscsiAdapterPolicy,
    /// Fibre Channel zone policy.
    #[serde(alias = "fibre_channel_zone_policy")]
    FcZonePolicy,
    /// Ethernet network group policy.
    EthernetNetworkGroupPolicy,
    /// LAN connectivity policy.
    LanConnectivityPolicy,
    /// Fibre Channel network policy.
    #[serde(alias = "fibre_channel_network_policy")]
    FcNetworkPolicy,
    /// Network connectivity (DNS) policy.
    NetworkConnectivityPolicy,
    /// SAN connectivity policy.
    SanConnectivityPolicy,
    /// Fibre Channel adapter policy.
    #[serde(alias = "fibre_channel_adapter_policy")]
    FcAdapterPolicy,
    /// iSCSI boot policy.
    IscsiBootPolicy,
    /// Storage policy.
    StoragePolicy,
    /// Drive group of a storage policy.
    DriveGroup,
    /// Virtual Fibre Channel interface of a SAN connectivity policy.
    #[serde(alias = "virtual_fibre_channel_interface")]
    VirtualFcInterface,
    /// Server profile template with attached policies.
    ServerProfileTemplate,
    /// Fabric port policy with its port modes, roles, channels and pin groups.
    FabricPortPolicy,
}

impl ResourceKind {
    /// Every supported kind.
    pub const ALL: [Self; 17] = [
        Self::MacPool,
        Self::FcPool,
        Self::IpPool,
        Self::IscsiAdapterPolicy,
        Self::FcZonePolicy,
        Self::EthernetNetworkGroupPolicy,
        Self::LanConnectivityPolicy,
        Self::FcNetworkPolicy,
        Self::NetworkConnectivityPolicy,
        Self::SanConnectivityPolicy,
        Self::FcAdapterPolicy,
        Self::IscsiBootPolicy,
        Self::StoragePolicy,
        Self::DriveGroup,
        Self::VirtualFcInterface,
        Self::ServerProfileTemplate,
        Self::FabricPortPolicy,
    ];

    /// Manifest name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MacPool => "mac_pool",
            Self::FcPool => "fc_pool",
            Self::IpPool => "ip_pool",
            Self::IscsiAdapterPolicy => "iscsi_adapter_policy",
            Self::FcZonePolicy => "fc_zone_policy",
            Self::EthernetNetworkGroupPolicy => "ethernet_network_group_policy",
            Self::LanConnectivityPolicy => "lan_connectivity_policy",
            Self::FcNetworkPolicy => "fc_network_policy",
            Self::NetworkConnectivityPolicy => "network_connectivity_policy",
            Self::SanConnectivityPolicy => "san_connectivity_policy",
            Self::FcAdapterPolicy => "fc_adapter_policy",
            Self::IscsiBootPolicy => "iscsi_boot_policy",
            Self::StoragePolicy => "storage_policy",
            Self::DriveGroup => "drive_group",
            Self::VirtualFcInterface => "virtual_fc_interface",
            Self::ServerProfileTemplate => "server_profile_template",
            Self::FabricPortPolicy => "fabric_port_policy",
        }
    }

    /// Declarative table of the kind.
    #[must_use]
    pub fn definition(self) -> &'static ResourceDefinition {
        catalog::definition(self)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the natural key of a kind is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `Name` within `Organization.Moid`.
    Organization,
    /// `Name` within `Parent.Moid`, where the parent is the named reference
    /// parameter.
    Parent(&'static str),
}

/// Declarative description of one resource kind.
#[derive(Debug)]
pub struct ResourceDefinition {
    /// Human readable type.
    pub label: &'static str,
    /// Collection path.
    pub resource_path: &'static str,
    /// Natural key scope.
    pub scope: Scope,
    /// Longest name Intersight accepts for this kind.
    pub max_name_len: usize,
    /// Declared table-driven parameters.
    pub fields: &'static [FieldSpec],
    /// Parameters handled by a dedicated module instead of the table.
    pub extra_params: &'static [&'static str],
}

/// Shared collaborators of one module invocation.
#[derive(Clone, Copy)]
pub struct ModuleContext<'a> {
    /// Intersight endpoint.
    pub api: &'a dyn IntersightApi,
    /// Natural-key lookups.
    pub locator: Locator<'a>,
    /// Body construction.
    pub normalizer: Normalizer<'a>,
    /// Present/absent state machine.
    pub reconciler: Reconciler<'a>,
}

impl<'a> ModuleContext<'a> {
    /// Wires the engine around `api`.
    #[must_use]
    pub const fn new(api: &'a dyn IntersightApi, check_mode: bool) -> Self {
        let locator = Locator::new(api);
        Self {
            api,
            locator,
            normalizer: Normalizer::new(locator),
            reconciler: Reconciler::new(api).with_check_mode(check_mode),
        }
    }

    /// Returns true if mutating calls are suppressed.
    #[must_use]
    pub const fn check_mode(&self) -> bool {
        self.reconciler.check_mode()
    }
}

/// Result of one module invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleResult {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name.
    pub name: String,
    /// Requested state.
    pub state: DesiredState,
    /// Whether any step changed remote state.
    pub changed: bool,
    /// Final remote representation of the primary resource.
    pub api_response: Option<Value>,
    /// Every reconciled resource, in execution order.
    pub steps: Vec<ReconcileOutcome>,
}

impl ModuleResult {
    /// Creates an empty result for `config`.
    #[must_use]
    pub fn new(config: &ResourceConfig) -> Self {
        Self {
            kind: config.kind,
            name: config.name.clone(),
            state: config.state,
            changed: false,
            api_response: None,
            steps: Vec::new(),
        }
    }

    /// Records a sub-resource step.
    pub fn record(&mut self, outcome: ReconcileOutcome) {
        self.changed |= outcome.changed;
        self.steps.push(outcome);
    }

    /// Records the step of the primary resource.
    pub fn record_primary(&mut self, outcome: ReconcileOutcome) {
        self.api_response = outcome.resource.clone().map(RemoteResource::into_value);
        self.record(outcome);
    }

    /// Number of steps that changed remote state.
    #[must_use]
    pub fn changed_steps(&self) -> usize {
        self.steps.iter().filter(|step| step.changed).count()
    }
}

impl fmt::Display for ModuleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.changed { "changed" } else { "ok" };
        writeln!(f, "{} '{}' ({}): {status}", self.kind, self.name, self.state)?;
        for step in &self.steps {
            writeln!(f, "  - {step}")?;
        }
        Ok(())
    }
}

/// Checks the parameters of an entry without any remote call.
///
/// # Errors
///
/// Returns an error for undeclared parameters, invalid composite settings
/// or port ranges whose start exceeds their end.
pub fn validate_params(config: &ResourceConfig) -> Result<()> {
    let definition = config.kind.definition();
    check_params(
        config.kind.as_str(),
        definition.fields,
        definition.extra_params,
        &config.params,
    )?;

    if config.kind == ResourceKind::FabricPortPolicy {
        PortPolicyLayout::parse(&config.params)?.validate()?;
    }
    Ok(())
}

/// Reconciles one manifest entry.
///
/// # Errors
///
/// Returns the first validation, resolution, transport or reconciliation
/// error. Changes applied before the error are kept.
pub async fn reconcile_resource(
    ctx: &ModuleContext<'_>,
    config: &ResourceConfig,
) -> Result<ModuleResult> {
    validate_params(config)?;

    match config.kind {
        ResourceKind::FabricPortPolicy => port_policy::reconcile(ctx, config).await,
        ResourceKind::ServerProfileTemplate => profile_template::reconcile(ctx, config).await,
        _ => policy::reconcile(ctx, config).await,
    }
}
