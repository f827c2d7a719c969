//! Fabric port policies.
//!
//! A port policy owns four kinds of sub-resources: port modes, port roles
//! (one resource per port), port channels and pin groups. Each one goes
//! through the same present/absent state machine as the policy, in
//! dependency order: the policy first on `present`, the policy last on
//! `absent`.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::{DesiredState, ResourceConfig};
use crate::engine::ReferenceTarget;
use crate::error::{ConfigError, ReconcileError, ResolveError, Result};
use crate::intersight::{DesiredSpec, Filter};

use super::policy::{natural_key, reconcile_primary, resolve_owner};
use super::{ModuleContext, ModuleResult};

const PORT_MODES_PATH: &str = "/fabric/PortModes";

const ETH_NETWORK_CONTROL: ReferenceTarget =
    ReferenceTarget::new("Eth Network Control Policy", "/fabric/EthNetworkControlPolicies");
const ETH_NETWORK_GROUP: ReferenceTarget =
    ReferenceTarget::new("Eth Network Group Policy", "/fabric/EthNetworkGroupPolicies");
const FLOW_CONTROL: ReferenceTarget =
    ReferenceTarget::new("Flow Control Policy", "/fabric/FlowControlPolicies");
const LINK_CONTROL: ReferenceTarget =
    ReferenceTarget::new("Link Control Policy", "/fabric/LinkControlPolicies");
const LINK_AGGREGATION: ReferenceTarget =
    ReferenceTarget::new("Link Aggregation Policy", "/fabric/LinkAggregationPolicies");

const LAYOUT_KEYS: [&str; 4] = ["port_modes", "port_roles", "port_channels", "pin_groups"];

/// Sub-resources declared under a fabric port policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortPolicyLayout {
    /// Port modes (unified port ranges).
    #[serde(default)]
    pub port_modes: Vec<PortMode>,
    /// Port roles, expanded to one resource per port.
    #[serde(default)]
    pub port_roles: Vec<PortRole>,
    /// Port channels.
    #[serde(default)]
    pub port_channels: Vec<PortChannel>,
    /// LAN and SAN pin groups.
    #[serde(default)]
    pub pin_groups: Vec<PinGroup>,
}

/// A port mode range.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortMode {
    /// Mode such as `FibreChannel` or `BreakoutEthernet25G`.
    #[serde(default)]
    pub custom_mode: Option<String>,
    /// First port.
    pub port_id_start: u32,
    /// Last port, inclusive.
    pub port_id_end: u32,
    /// Switch slot.
    pub slot_id: u32,
}

/// Role of a single port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PortRoleKind {
    /// Appliance port.
    Appliance,
    /// Ethernet uplink.
    EthernetUplink,
    /// Fibre Channel uplink.
    FcUplink,
    /// FCoE uplink.
    FcoeUplink,
    /// Fibre Channel storage port.
    FcStorage,
    /// Server port.
    Server,
}

impl PortRoleKind {
    /// Collection holding roles of this kind.
    #[must_use]
    pub const fn resource_path(self) -> &'static str {
        match self {
            Self::Appliance => "/fabric/ApplianceRoles",
            Self::EthernetUplink => "/fabric/UplinkRoles",
            Self::FcUplink => "/fabric/FcUplinkRoles",
            Self::FcoeUplink => "/fabric/FcoeUplinkRoles",
            Self::FcStorage => "/fabric/FcStorageRoles",
            Self::Server => "/fabric/ServerRoles",
        }
    }
}

/// Role assignment for a range of ports.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortRole {
    /// Role of every port in the range.
    pub port_role: PortRoleKind,
    /// First port.
    pub port_id_start: u32,
    /// Last port, inclusive.
    pub port_id_end: u32,
    /// Switch slot.
    pub slot_id: u32,
    /// Breakout port, 0 if none.
    #[serde(default)]
    pub aggregate_port_id: u32,
    /// Settings for `Appliance`.
    #[serde(default)]
    pub appliance_spec: Option<ApplianceSettings>,
    /// Settings for `Server`.
    #[serde(default)]
    pub server_spec: Option<ServerSettings>,
    /// Settings for `FcStorage`.
    #[serde(default)]
    pub fc_storage_spec: Option<FcSettings>,
    /// Settings for `FcUplink`.
    #[serde(default)]
    pub fc_uplink_spec: Option<FcSettings>,
    /// Settings for `FcoeUplink`.
    #[serde(default)]
    pub fcoe_uplink_spec: Option<FcoeUplinkSettings>,
    /// Settings for `EthernetUplink`.
    #[serde(default)]
    pub eth_uplink_spec: Option<EthUplinkSettings>,
}

/// Appliance port settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplianceSettings {
    /// `trunk` or `access`.
    #[serde(default)]
    pub mode: Option<String>,
    /// QoS priority.
    #[serde(default)]
    pub priority: Option<String>,
    /// Admin speed.
    #[serde(default)]
    pub admin_speed: Option<String>,
    /// Forward error correction.
    #[serde(default)]
    pub fec: Option<String>,
    /// Ethernet network control policy name.
    pub eth_network_control_policy: String,
    /// Ethernet network group policy name.
    pub eth_network_group_policy: String,
}

/// Server port settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSettings {
    /// Disable auto negotiation.
    #[serde(default)]
    pub auto_negotiation_disabled: Option<bool>,
    /// Forward error correction.
    #[serde(default)]
    pub fec: Option<String>,
}

/// Fibre Channel uplink or storage settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FcSettings {
    /// Admin speed.
    #[serde(default)]
    pub admin_speed: Option<String>,
    /// VSAN.
    #[serde(default)]
    pub vsan_id: Option<u32>,
}

/// FCoE uplink port settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FcoeUplinkSettings {
    /// Admin speed.
    #[serde(default)]
    pub admin_speed: Option<String>,
    /// Forward error correction.
    #[serde(default)]
    pub fec: Option<String>,
    /// Link control policy name.
    pub link_control_policy: String,
}

/// Ethernet uplink port settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EthUplinkSettings {
    /// Admin speed.
    #[serde(default)]
    pub admin_speed: Option<String>,
    /// Forward error correction.
    #[serde(default)]
    pub fec: Option<String>,
    /// Ethernet network group policy name.
    pub eth_network_group_policy: String,
    /// Flow control policy name.
    pub flow_control_policy: String,
    /// Link control policy name.
    pub link_control_policy: String,
}

/// Role of a port channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PortChannelKind {
    /// Appliance port channel.
    Appliance,
    /// Ethernet uplink port channel.
    EthernetUplink,
    /// Fibre Channel uplink port channel.
    FcUplink,
    /// FCoE uplink port channel.
    FcoeUplink,
}

impl PortChannelKind {
    /// Collection holding port channels of this kind.
    #[must_use]
    pub const fn resource_path(self) -> &'static str {
        match self {
            Self::Appliance => "/fabric/AppliancePcRoles",
            Self::EthernetUplink => "/fabric/UplinkPcRoles",
            Self::FcUplink => "/fabric/FcUplinkPcRoles",
            Self::FcoeUplink => "/fabric/FcoeUplinkPcRoles",
        }
    }
}

/// A port channel over a range of ports.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortChannel {
    /// Role of the channel.
    pub port_channel_role_type: PortChannelKind,
    /// Channel identifier.
    pub pc_id: u32,
    /// First member port.
    pub port_id_start: u32,
    /// Last member port, inclusive.
    pub port_id_end: u32,
    /// Switch slot.
    pub slot_id: u32,
    /// Breakout port, 0 if none.
    #[serde(default)]
    pub aggregate_port_id: u32,
    /// Settings for `Appliance`.
    #[serde(default)]
    pub appliance_pc_spec: Option<AppliancePcSettings>,
    /// Settings for `FcUplink`.
    #[serde(default)]
    pub fc_uplink_pc_spec: Option<FcSettings>,
    /// Settings for `FcoeUplink`.
    #[serde(default)]
    pub fcoe_uplink_pc_spec: Option<FcoePcSettings>,
    /// Settings for `EthernetUplink`.
    #[serde(default)]
    pub eth_uplink_pc_spec: Option<EthPcSettings>,
}

/// Appliance port channel settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppliancePcSettings {
    /// `trunk` or `access`.
    #[serde(default)]
    pub mode: Option<String>,
    /// Admin speed.
    #[serde(default)]
    pub admin_speed: Option<String>,
    /// QoS priority.
    #[serde(default)]
    pub priority: Option<String>,
    /// Ethernet network control policy name.
    pub eth_network_control_policy: String,
    /// Ethernet network group policy name.
    pub eth_network_group_policy: String,
    /// Link aggregation policy name.
    pub link_aggregation_policy: String,
}

/// FCoE uplink port channel settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FcoePcSettings {
    /// Admin speed.
    #[serde(default)]
    pub admin_speed: Option<String>,
    /// Link control policy name.
    pub link_control_policy: String,
    /// Link aggregation policy name.
    pub link_aggregation_policy: String,
}

/// Ethernet uplink port channel settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EthPcSettings {
    /// Admin speed.
    #[serde(default)]
    pub admin_speed: Option<String>,
    /// Flow control policy name.
    pub flow_control_policy: String,
    /// Ethernet network group policy name.
    pub eth_network_group_policy: String,
    /// Link control policy name.
    pub link_control_policy: String,
    /// Link aggregation policy name.
    pub link_aggregation_policy: String,
}

/// Pin group type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PinGroupType {
    /// Ethernet pin group.
    Lan,
    /// Fibre Channel pin group.
    San,
}

impl PinGroupType {
    /// Collection holding pin groups of this type.
    #[must_use]
    pub const fn resource_path(self) -> &'static str {
        match self {
            Self::Lan => "/fabric/LanPinGroups",
            Self::San => "/fabric/SanPinGroups",
        }
    }
}

/// Kind of interface a pin group targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PinTargetType {
    /// A single uplink port.
    Port,
    /// An uplink port channel.
    PortChannel,
}

/// Uplink roles a pin group can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UplinkRole {
    /// Ethernet uplink.
    EthernetUplink,
    /// Fibre Channel uplink.
    FcUplink,
    /// FCoE uplink.
    FcoeUplink,
}

impl UplinkRole {
    const fn port_role(self) -> PortRoleKind {
        match self {
            Self::EthernetUplink => PortRoleKind::EthernetUplink,
            Self::FcUplink => PortRoleKind::FcUplink,
            Self::FcoeUplink => PortRoleKind::FcoeUplink,
        }
    }

    const fn channel_kind(self) -> PortChannelKind {
        match self {
            Self::EthernetUplink => PortChannelKind::EthernetUplink,
            Self::FcUplink => PortChannelKind::FcUplink,
            Self::FcoeUplink => PortChannelKind::FcoeUplink,
        }
    }
}

/// A LAN or SAN pin group.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinGroup {
    /// Pin group name, unique within the policy.
    pub name: String,
    /// LAN or SAN.
    #[serde(rename = "type")]
    pub group_type: PinGroupType,
    /// Target interface kind.
    pub pin_target_interface_type: PinTargetType,
    /// Target port, for `Port`.
    #[serde(default)]
    pub port_spec: Option<PinPort>,
    /// Target port channel, for `PortChannel`.
    #[serde(default)]
    pub port_channel_spec: Option<PinPortChannel>,
}

/// Port targeted by a pin group.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinPort {
    /// Port.
    pub port_id: u32,
    /// Switch slot.
    pub slot_id: u32,
    /// Breakout port, 0 if none.
    #[serde(default)]
    pub aggregate_port_id: u32,
    /// Role the port was configured with.
    pub port_role: UplinkRole,
}

/// Port channel targeted by a pin group.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinPortChannel {
    /// Channel identifier.
    pub pc_id: u32,
    /// Role the channel was configured with.
    pub pc_role: UplinkRole,
}

impl PortPolicyLayout {
    /// Extracts the sub-resource lists from the entry parameters.
    ///
    /// # Errors
    ///
    /// Returns a validation error if a list does not match its schema.
    pub fn parse(params: &Map<String, Value>) -> Result<Self> {
        let layout: Map<String, Value> = LAYOUT_KEYS
            .iter()
            .filter_map(|key| {
                params
                    .get(*key)
                    .filter(|value| !value.is_null())
                    .map(|value| ((*key).to_string(), value.clone()))
            })
            .collect();

        serde_json::from_value(Value::Object(layout)).map_err(|err| {
            ConfigError::validation(format!("invalid port policy layout: {err}"), "port_policy")
                .into()
        })
    }

    /// Checks ranges and role-specific settings blocks.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRange`] for a range whose start exceeds
    /// its end, or a validation error for a missing settings block.
    pub fn validate(&self) -> Result<()> {
        for (index, mode) in self.port_modes.iter().enumerate() {
            check_range(format!("port_modes[{index}]"), mode.port_id_start, mode.port_id_end)?;
        }

        for (index, role) in self.port_roles.iter().enumerate() {
            let field = format!("port_roles[{index}]");
            check_range(field.clone(), role.port_id_start, role.port_id_end)?;
            let (present, block) = match role.port_role {
                PortRoleKind::Appliance => (role.appliance_spec.is_some(), "appliance_spec"),
                PortRoleKind::EthernetUplink => (role.eth_uplink_spec.is_some(), "eth_uplink_spec"),
                PortRoleKind::FcUplink => (role.fc_uplink_spec.is_some(), "fc_uplink_spec"),
                PortRoleKind::FcoeUplink => (role.fcoe_uplink_spec.is_some(), "fcoe_uplink_spec"),
                PortRoleKind::FcStorage => (role.fc_storage_spec.is_some(), "fc_storage_spec"),
                PortRoleKind::Server => (role.server_spec.is_some(), "server_spec"),
            };
            require_block(present, &field, &format!("{:?}", role.port_role), block)?;
        }

        for (index, channel) in self.port_channels.iter().enumerate() {
            let field = format!("port_channels[{index}]");
            check_range(field.clone(), channel.port_id_start, channel.port_id_end)?;
            let (present, block) = match channel.port_channel_role_type {
                PortChannelKind::Appliance => {
                    (channel.appliance_pc_spec.is_some(), "appliance_pc_spec")
                }
                PortChannelKind::EthernetUplink => {
                    (channel.eth_uplink_pc_spec.is_some(), "eth_uplink_pc_spec")
                }
                PortChannelKind::FcUplink => (channel.fc_uplink_pc_spec.is_some(), "fc_uplink_pc_spec"),
                PortChannelKind::FcoeUplink => {
                    (channel.fcoe_uplink_pc_spec.is_some(), "fcoe_uplink_pc_spec")
                }
            };
            let kind = format!("{:?}", channel.port_channel_role_type);
            require_block(present, &field, &kind, block)?;
        }

        for (index, group) in self.pin_groups.iter().enumerate() {
            let field = format!("pin_groups[{index}]");
            let (present, block) = match group.pin_target_interface_type {
                PinTargetType::Port => (group.port_spec.is_some(), "port_spec"),
                PinTargetType::PortChannel => (group.port_channel_spec.is_some(), "port_channel_spec"),
            };
            let kind = format!("{:?}", group.pin_target_interface_type);
            require_block(present, &field, &kind, block)?;
        }

        Ok(())
    }

    /// Returns true if no sub-resource is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.port_modes.is_empty()
            && self.port_roles.is_empty()
            && self.port_channels.is_empty()
            && self.pin_groups.is_empty()
    }
}

fn check_range(field: String, start: u32, end: u32) -> Result<()> {
    if start > end {
        return Err(ConfigError::InvalidRange { field, start, end }.into());
    }
    Ok(())
}

fn require_block(present: bool, field: &str, kind: &str, block: &str) -> Result<()> {
    if present {
        Ok(())
    } else {
        Err(ConfigError::validation(
            format!("{field}: {kind} requires '{block}'"),
            format!("{field}.{block}"),
        )
        .into())
    }
}

/// Reconciles the policy and its sub-resources.
pub(super) async fn reconcile(ctx: &ModuleContext<'_>, config: &ResourceConfig) -> Result<ModuleResult> {
    let layout = PortPolicyLayout::parse(&config.params)?;
    layout.validate()?;

    match config.state {
        DesiredState::Present => apply_present(ctx, config, &layout).await,
        DesiredState::Absent => apply_absent(ctx, config, &layout).await,
    }
}

async fn apply_present(
    ctx: &ModuleContext<'_>,
    config: &ResourceConfig,
    layout: &PortPolicyLayout,
) -> Result<ModuleResult> {
    let mut result = ModuleResult::new(config);
    let Some(outcome) = reconcile_primary(ctx, config).await? else {
        return Ok(result);
    };
    let policy = outcome.moid().map(str::to_string);
    result.record_primary(outcome);

    let Some(policy) = policy else {
        if !layout.is_empty() {
            info!("[check] port policy '{}' would be created with its sub-resources", config.name);
        }
        return Ok(result);
    };

    let mut run = SubResources::new(*ctx, policy, config, result);
    for mode in &layout.port_modes {
        run.port_mode(mode, DesiredState::Present).await?;
    }
    for role in &layout.port_roles {
        run.port_role(role, DesiredState::Present).await?;
    }
    for channel in &layout.port_channels {
        run.port_channel(channel, DesiredState::Present).await?;
    }
    for group in &layout.pin_groups {
        run.pin_group(group, DesiredState::Present).await?;
    }
    Ok(run.result)
}

async fn apply_absent(
    ctx: &ModuleContext<'_>,
    config: &ResourceConfig,
    layout: &PortPolicyLayout,
) -> Result<ModuleResult> {
    let result = ModuleResult::new(config);
    let definition = config.kind.definition();
    let Some(owner) = resolve_owner(ctx, definition, config).await? else {
        return Ok(result);
    };
    let filter = natural_key(&config.name, &owner);
    let Some(current) = ctx.locator.find(definition.resource_path, &filter).await? else {
        debug!("Port policy '{}' does not exist", config.name);
        return Ok(result);
    };
    let policy = current
        .moid()
        .map(str::to_string)
        .ok_or_else(|| ReconcileError::MissingIdentifier {
            resource_path: definition.resource_path.to_string(),
        })?;

    let mut run = SubResources::new(*ctx, policy, config, result);
    for group in &layout.pin_groups {
        run.pin_group(group, DesiredState::Absent).await?;
    }
    for channel in &layout.port_channels {
        run.port_channel(channel, DesiredState::Absent).await?;
    }
    for role in &layout.port_roles {
        run.port_role(role, DesiredState::Absent).await?;
    }
    for mode in &layout.port_modes {
        run.port_mode(mode, DesiredState::Absent).await?;
    }

    let outcome = ctx
        .reconciler
        .apply(
            definition.resource_path,
            Some(current),
            DesiredState::Absent,
            &DesiredSpec::new(),
        )
        .await?;
    let mut result = run.result;
    result.record_primary(outcome);
    Ok(result)
}

/// Reconciles sub-resources of one existing port policy.
struct SubResources<'a> {
    ctx: ModuleContext<'a>,
    policy: String,
    tags: Option<Value>,
    result: ModuleResult,
}

impl<'a> SubResources<'a> {
    fn new(ctx: ModuleContext<'a>, policy: String, config: &ResourceConfig, result: ModuleResult) -> Self {
        Self {
            ctx,
            policy,
            tags: config.params.get("tags").cloned(),
            result,
        }
    }

    async fn converge(
        &mut self,
        resource_path: &str,
        filter: &Filter,
        state: DesiredState,
        body: &DesiredSpec,
    ) -> Result<()> {
        let outcome = self
            .ctx
            .reconciler
            .reconcile(resource_path, filter, state, body)
            .await?;
        self.result.record(outcome);
        Ok(())
    }

    /// Body shared by every sub-resource: the policy tags.
    fn base_body(&self) -> DesiredSpec {
        let mut body = DesiredSpec::new();
        if let Some(tags) = &self.tags {
            body.insert_if_present("Tags", tags.clone());
        }
        body
    }

    async fn require(&self, target: ReferenceTarget, name: &str) -> Result<Value> {
        let moid = self.ctx.locator.require(&target, name).await?;
        Ok(json!({ "Moid": moid }))
    }

    async fn port_mode(&mut self, mode: &PortMode, state: DesiredState) -> Result<()> {
        let filter = Filter::new()
            .equals("PortIdStart", mode.port_id_start)
            .equals("PortIdEnd", mode.port_id_end)
            .equals("PortPolicy.Moid", self.policy.as_str());

        let mut body = DesiredSpec::new();
        if state == DesiredState::Present {
            body = self.base_body();
            body.insert_if_present("CustomMode", mode.custom_mode.clone());
            // Key integers bypass the falsy rule: 0 is a valid id and the
            // body must match the lookup filter.
            body.insert("PortIdEnd", mode.port_id_end);
            body.insert("PortIdStart", mode.port_id_start);
            body.insert("SlotId", mode.slot_id);
            body.insert_reference("PortPolicy", &self.policy);
        }
        self.converge(PORT_MODES_PATH, &filter, state, &body).await
    }

    /// One resource per port in the range. References are resolved once
    /// per role entry.
    async fn port_role(&mut self, role: &PortRole, state: DesiredState) -> Result<()> {
        let resource_path = role.port_role.resource_path();
        let (settings, references) = match state {
            DesiredState::Present => (role_settings(role), self.role_references(role).await?),
            DesiredState::Absent => (Vec::new(), Vec::new()),
        };

        for port_id in role.port_id_start..=role.port_id_end {
            let filter = Filter::new()
                .equals("PortId", port_id)
                .equals("AggregatePortId", role.aggregate_port_id)
                .equals("SlotId", role.slot_id)
                .equals("Parent.Moid", self.policy.as_str());

            let mut body = DesiredSpec::new();
            if state == DesiredState::Present {
                body = self.base_body();
                // Sent even when 0, like the filter above.
                body.insert("PortId", port_id);
                body.insert("SlotId", role.slot_id);
                body.insert("AggregatePortId", role.aggregate_port_id);
                body.insert_reference("PortPolicy", &self.policy);
                for (key, value) in &settings {
                    body.insert_if_present(*key, value.clone());
                }
                for (key, value) in &references {
                    body.insert(*key, value.clone());
                }
            }
            self.converge(resource_path, &filter, state, &body).await?;
        }
        Ok(())
    }

    async fn role_references(&self, role: &PortRole) -> Result<Vec<(&'static str, Value)>> {
        let mut references = Vec::new();
        match role.port_role {
            PortRoleKind::Appliance => {
                let spec = settings_block(role.appliance_spec.as_ref(), "appliance_spec")?;
                references.push((
                    "EthNetworkControlPolicy",
                    self.require(ETH_NETWORK_CONTROL, &spec.eth_network_control_policy).await?,
                ));
                references.push((
                    "EthNetworkGroupPolicy",
                    self.require(ETH_NETWORK_GROUP, &spec.eth_network_group_policy).await?,
                ));
            }
            PortRoleKind::FcoeUplink => {
                let spec = settings_block(role.fcoe_uplink_spec.as_ref(), "fcoe_uplink_spec")?;
                references.push((
                    "LinkControlPolicy",
                    self.require(LINK_CONTROL, &spec.link_control_policy).await?,
                ));
            }
            PortRoleKind::EthernetUplink => {
                let spec = settings_block(role.eth_uplink_spec.as_ref(), "eth_uplink_spec")?;
                let group = self.require(ETH_NETWORK_GROUP, &spec.eth_network_group_policy).await?;
                references.push(("EthNetworkGroupPolicy", Value::Array(vec![group])));
                references.push((
                    "FlowControlPolicy",
                    self.require(FLOW_CONTROL, &spec.flow_control_policy).await?,
                ));
                references.push((
                    "LinkControlPolicy",
                    self.require(LINK_CONTROL, &spec.link_control_policy).await?,
                ));
            }
            PortRoleKind::FcUplink | PortRoleKind::FcStorage | PortRoleKind::Server => {}
        }
        Ok(references)
    }

    async fn port_channel(&mut self, channel: &PortChannel, state: DesiredState) -> Result<()> {
        let resource_path = channel.port_channel_role_type.resource_path();
        let filter = Filter::new()
            .equals("PcId", channel.pc_id)
            .equals("PortPolicy.Moid", self.policy.as_str());

        let mut body = DesiredSpec::new();
        if state == DesiredState::Present {
            let references = self.channel_references(channel).await?;
            body = self.base_body();
            // Sent even when 0, like the filter above.
            body.insert("PcId", channel.pc_id);
            for (key, value) in channel_settings(channel) {
                body.insert_if_present(key, value);
            }
            for (key, value) in references {
                body.insert(key, value);
            }
            let ports: Vec<Value> = (channel.port_id_start..=channel.port_id_end)
                .map(|port_id| {
                    json!({
                        "PortId": port_id,
                        "SlotId": channel.slot_id,
                        "AggregatePortId": channel.aggregate_port_id,
                    })
                })
                .collect();
            body.insert("Ports", ports);
            body.insert_reference("PortPolicy", &self.policy);
        }
        self.converge(resource_path, &filter, state, &body).await
    }

    async fn channel_references(&self, channel: &PortChannel) -> Result<Vec<(&'static str, Value)>> {
        let mut references = Vec::new();
        match channel.port_channel_role_type {
            PortChannelKind::Appliance => {
                let spec = settings_block(channel.appliance_pc_spec.as_ref(), "appliance_pc_spec")?;
                references.push((
                    "EthNetworkControlPolicy",
                    self.require(ETH_NETWORK_CONTROL, &spec.eth_network_control_policy).await?,
                ));
                references.push((
                    "EthNetworkGroupPolicy",
                    self.require(ETH_NETWORK_GROUP, &spec.eth_network_group_policy).await?,
                ));
                references.push((
                    "LinkAggregationPolicy",
                    self.require(LINK_AGGREGATION, &spec.link_aggregation_policy).await?,
                ));
            }
            PortChannelKind::FcoeUplink => {
                let spec = settings_block(channel.fcoe_uplink_pc_spec.as_ref(), "fcoe_uplink_pc_spec")?;
                references.push((
                    "LinkControlPolicy",
                    self.require(LINK_CONTROL, &spec.link_control_policy).await?,
                ));
                references.push((
                    "LinkAggregationPolicy",
                    self.require(LINK_AGGREGATION, &spec.link_aggregation_policy).await?,
                ));
            }
            PortChannelKind::EthernetUplink => {
                let spec = settings_block(channel.eth_uplink_pc_spec.as_ref(), "eth_uplink_pc_spec")?;
                references.push((
                    "FlowControlPolicy",
                    self.require(FLOW_CONTROL, &spec.flow_control_policy).await?,
                ));
                let group = self.require(ETH_NETWORK_GROUP, &spec.eth_network_group_policy).await?;
                references.push(("EthNetworkGroupPolicy", Value::Array(vec![group])));
                references.push((
                    "LinkAggregationPolicy",
                    self.require(LINK_AGGREGATION, &spec.link_aggregation_policy).await?,
                ));
                references.push((
                    "LinkControlPolicy",
                    self.require(LINK_CONTROL, &spec.link_control_policy).await?,
                ));
            }
            PortChannelKind::FcUplink => {}
        }
        Ok(references)
    }

    async fn pin_group(&mut self, group: &PinGroup, state: DesiredState) -> Result<()> {
        let resource_path = group.group_type.resource_path();
        let filter = Filter::by_name(group.name.as_str()).equals("PortPolicy.Moid", self.policy.as_str());

        let mut body = DesiredSpec::new();
        if state == DesiredState::Present {
            let target = self.pin_target(group).await?;
            body.insert("Name", group.name.as_str());
            body.insert("PinTargetInterfaceRole", target);
            body.insert_reference("PortPolicy", &self.policy);
        }
        self.converge(resource_path, &filter, state, &body).await
    }

    /// Locates the uplink port or port channel a pin group targets.
    async fn pin_target(&self, group: &PinGroup) -> Result<Value> {
        let (resource_path, filter, description) = match group.pin_target_interface_type {
            PinTargetType::Port => {
                let port = settings_block(group.port_spec.as_ref(), "port_spec")?;
                let filter = Filter::new()
                    .equals("PortId", port.port_id)
                    .equals("AggregatePortId", port.aggregate_port_id)
                    .equals("SlotId", port.slot_id)
                    .equals("PortPolicy.Moid", self.policy.as_str());
                let description = format!("slot {} port {}", port.slot_id, port.port_id);
                (port.port_role.port_role().resource_path(), filter, description)
            }
            PinTargetType::PortChannel => {
                let channel = settings_block(group.port_channel_spec.as_ref(), "port_channel_spec")?;
                let filter = Filter::new()
                    .equals("PcId", channel.pc_id)
                    .equals("PortPolicy.Moid", self.policy.as_str());
                let description = format!("port channel {}", channel.pc_id);
                (channel.pc_role.channel_kind().resource_path(), filter, description)
            }
        };

        let found = self.ctx.locator.find(resource_path, &filter).await?;
        let (Some(moid), object_type) = (
            found.as_ref().and_then(|role| role.moid()),
            found.as_ref().and_then(|role| role.object_type()),
        ) else {
            return Err(ResolveError::not_found("Pin target interface", description, resource_path).into());
        };
        Ok(json!({ "Moid": moid, "ObjectType": object_type }))
    }
}

fn settings_block<'s, T>(block: Option<&'s T>, name: &str) -> Result<&'s T> {
    block.ok_or_else(|| ConfigError::validation(format!("'{name}' is required"), name).into())
}

fn role_settings(role: &PortRole) -> Vec<(&'static str, Value)> {
    match role.port_role {
        PortRoleKind::Appliance => role.appliance_spec.as_ref().map_or_else(Vec::new, |spec| {
            vec![
                ("Mode", json!(spec.mode)),
                ("Priority", json!(spec.priority)),
                ("AdminSpeed", json!(spec.admin_speed)),
                ("Fec", json!(spec.fec)),
            ]
        }),
        PortRoleKind::Server => role.server_spec.as_ref().map_or_else(Vec::new, |spec| {
            vec![
                ("AutoNegotiationDisabled", json!(spec.auto_negotiation_disabled)),
                ("Fec", json!(spec.fec)),
            ]
        }),
        PortRoleKind::FcStorage => fc_settings(role.fc_storage_spec.as_ref()),
        PortRoleKind::FcUplink => fc_settings(role.fc_uplink_spec.as_ref()),
        PortRoleKind::FcoeUplink => role.fcoe_uplink_spec.as_ref().map_or_else(Vec::new, |spec| {
            vec![("AdminSpeed", json!(spec.admin_speed)), ("Fec", json!(spec.fec))]
        }),
        PortRoleKind::EthernetUplink => role.eth_uplink_spec.as_ref().map_or_else(Vec::new, |spec| {
            vec![("AdminSpeed", json!(spec.admin_speed)), ("Fec", json!(spec.fec))]
        }),
    }
}

fn channel_settings(channel: &PortChannel) -> Vec<(&'static str, Value)> {
    match channel.port_channel_role_type {
        PortChannelKind::Appliance => channel.appliance_pc_spec.as_ref().map_or_else(Vec::new, |spec| {
            vec![
                ("Mode", json!(spec.mode)),
                ("AdminSpeed", json!(spec.admin_speed)),
                ("Priority", json!(spec.priority)),
            ]
        }),
        PortChannelKind::FcUplink => fc_settings(channel.fc_uplink_pc_spec.as_ref()),
        PortChannelKind::FcoeUplink => channel
            .fcoe_uplink_pc_spec
            .as_ref()
            .map_or_else(Vec::new, |spec| vec![("AdminSpeed", json!(spec.admin_speed))]),
        PortChannelKind::EthernetUplink => channel
            .eth_uplink_pc_spec
            .as_ref()
            .map_or_else(Vec::new, |spec| vec![("AdminSpeed", json!(spec.admin_speed))]),
    }
}

fn fc_settings(spec: Option<&FcSettings>) -> Vec<(&'static str, Value)> {
    spec.map_or_else(Vec::new, |spec| {
        vec![("AdminSpeed", json!(spec.admin_speed)), ("VsanId", json!(spec.vsan_id))]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ReconcileAction, ORGANIZATIONS_PATH};
    use crate::error::IntersightError;
    use crate::resources::{reconcile_resource, ResourceKind};
    use crate::testing::FakeIntersight;

    fn port_policy(layout: Value) -> ResourceConfig {
        let params = match layout {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ResourceConfig::new(ResourceKind::FabricPortPolicy, "COS-FPP").with_params(params)
    }

    fn parse_layout(layout: Value) -> Result<PortPolicyLayout> {
        PortPolicyLayout::parse(&port_policy(layout).params)
    }

    fn full_layout() -> Value {
        json!({
            "device_model": "UCS-FI-6454",
            "port_modes": [
                {"custom_mode": "FibreChannel", "port_id_start": 1, "port_id_end": 4, "slot_id": 1}
            ],
            "port_roles": [{
                "port_role": "EthernetUplink",
                "port_id_start": 49,
                "port_id_end": 50,
                "slot_id": 1,
                "eth_uplink_spec": {
                    "admin_speed": "Auto",
                    "eth_network_group_policy": "eng-1",
                    "flow_control_policy": "fc-1",
                    "link_control_policy": "lc-1"
                }
            }],
            "port_channels": [{
                "port_channel_role_type": "EthernetUplink",
                "pc_id": 51,
                "port_id_start": 51,
                "port_id_end": 52,
                "slot_id": 1,
                "eth_uplink_pc_spec": {
                    "eth_network_group_policy": "eng-1",
                    "flow_control_policy": "fc-1",
                    "link_control_policy": "lc-1",
                    "link_aggregation_policy": "la-1"
                }
            }],
            "pin_groups": [{
                "name": "pin-49",
                "type": "LAN",
                "pin_target_interface_type": "Port",
                "port_spec": {"port_id": 49, "slot_id": 1, "port_role": "EthernetUplink"}
            }]
        })
    }

    fn seed_dependencies(api: &FakeIntersight) {
        api.seed(ORGANIZATIONS_PATH, json!({"Name": "default"}));
        api.seed("/fabric/EthNetworkGroupPolicies", json!({"Name": "eng-1"}));
        api.seed("/fabric/FlowControlPolicies", json!({"Name": "fc-1"}));
        api.seed("/fabric/LinkControlPolicies", json!({"Name": "lc-1"}));
        api.seed("/fabric/LinkAggregationPolicies", json!({"Name": "la-1"}));
    }

    fn paths(entries: &[String]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| {
                let (verb, target) = entry.split_once(' ').unwrap_or((entry.as_str(), ""));
                let collection: Vec<&str> = target.split('/').take(3).collect();
                format!("{verb} {}", collection.join("/"))
            })
            .collect()
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        let layout = parse_layout(
            json!({
                "port_roles": [{
                    "port_role": "Server",
                    "port_id_start": 10,
                    "port_id_end": 5,
                    "slot_id": 1,
                    "server_spec": {}
                }]
            }),
        )
        .unwrap();
        let err = layout.validate().unwrap_err();
        assert!(matches!(
            err,
            IntersightError::Config(ConfigError::InvalidRange { start: 10, end: 5, .. })
        ));
    }

    #[test]
    fn test_role_requires_settings_block() {
        let layout = parse_layout(
            json!({
                "port_roles": [{
                    "port_role": "Appliance",
                    "port_id_start": 1,
                    "port_id_end": 1,
                    "slot_id": 1
                }]
            }),
        )
        .unwrap();
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("appliance_spec"));
    }

    #[test]
    fn test_unknown_layout_key_is_rejected() {
        let err = parse_layout(
            json!({"port_modes": [{"port_id_start": 1, "port_id_end": 2, "slot_id": 1, "speed": 10}]}),
        )
        .unwrap_err();
        assert!(matches!(err, IntersightError::Config(_)));
    }

    #[tokio::test]
    async fn test_range_error_issues_no_remote_call() {
        let api = FakeIntersight::new();
        let ctx = ModuleContext::new(&api, false);
        let config = port_policy(json!({
            "port_modes": [{"port_id_start": 10, "port_id_end": 5, "slot_id": 1}]
        }));

        let err = reconcile_resource(&ctx, &config).await.unwrap_err();
        assert!(err.is_local());
        assert!(api.journal().is_empty());
    }

    #[tokio::test]
    async fn test_present_creates_parent_then_children() {
        let api = FakeIntersight::new();
        seed_dependencies(&api);
        let ctx = ModuleContext::new(&api, false);

        let result = reconcile_resource(&ctx, &port_policy(full_layout())).await.unwrap();
        assert!(result.changed);
        assert_eq!(result.changed_steps(), 6);
        assert_eq!(
            paths(&api.mutations()),
            vec![
                "POST /fabric/PortPolicies",
                "POST /fabric/PortModes",
                "POST /fabric/UplinkRoles",
                "POST /fabric/UplinkRoles",
                "POST /fabric/UplinkPcRoles",
                "POST /fabric/LanPinGroups",
            ]
        );
        assert_eq!(result.api_response.unwrap()["Name"], json!("COS-FPP"));

        let roles = api.resources("/fabric/UplinkRoles");
        assert_eq!(roles[0]["PortId"], json!(49));
        assert_eq!(roles[1]["PortId"], json!(50));
        assert_eq!(roles[0]["AggregatePortId"], json!(0));
        assert_eq!(roles[0]["SlotId"], json!(1));
        assert!(roles[0]["EthNetworkGroupPolicy"].is_array());

        let channel = &api.resources("/fabric/UplinkPcRoles")[0];
        assert_eq!(
            channel["Ports"],
            json!([
                {"PortId": 51, "SlotId": 1, "AggregatePortId": 0},
                {"PortId": 52, "SlotId": 1, "AggregatePortId": 0}
            ])
        );

        let pin_group = &api.resources("/fabric/LanPinGroups")[0];
        assert_eq!(pin_group["PinTargetInterfaceRole"]["Moid"], roles[0]["Moid"]);
        assert_eq!(
            pin_group["PinTargetInterfaceRole"]["ObjectType"],
            json!("fabric.UplinkRole")
        );

        let flow_lookups = api
            .journal()
            .iter()
            .filter(|entry| entry.starts_with("GET /fabric/FlowControlPolicies"))
            .count();
        assert_eq!(flow_lookups, 2);
    }

    #[tokio::test]
    async fn test_present_is_idempotent() {
        let api = FakeIntersight::new();
        seed_dependencies(&api);
        let ctx = ModuleContext::new(&api, false);

        reconcile_resource(&ctx, &port_policy(full_layout())).await.unwrap();
        let created = api.mutations().len();

        let again = reconcile_resource(&ctx, &port_policy(full_layout())).await.unwrap();
        assert!(!again.changed);
        assert!(again.steps.iter().all(|step| step.action == ReconcileAction::NoOp));
        assert_eq!(api.mutations().len(), created);
    }

    #[tokio::test]
    async fn test_absent_deletes_children_before_parent() {
        let api = FakeIntersight::new();
        seed_dependencies(&api);
        let ctx = ModuleContext::new(&api, false);

        reconcile_resource(&ctx, &port_policy(full_layout())).await.unwrap();
        let created = api.mutations().len();

        let absent = port_policy(full_layout()).with_state(DesiredState::Absent);
        let result = reconcile_resource(&ctx, &absent).await.unwrap();
        assert!(result.changed);
        assert!(result.api_response.is_none());
        assert_eq!(
            paths(&api.mutations()[created..]),
            vec![
                "DELETE /fabric/LanPinGroups",
                "DELETE /fabric/UplinkPcRoles",
                "DELETE /fabric/UplinkRoles",
                "DELETE /fabric/UplinkRoles",
                "DELETE /fabric/PortModes",
                "DELETE /fabric/PortPolicies",
            ]
        );
        assert!(api.resources("/fabric/PortPolicies").is_empty());
        assert!(api.resources("/fabric/UplinkRoles").is_empty());
    }

    #[tokio::test]
    async fn test_absent_without_parent_is_noop() {
        let api = FakeIntersight::new();
        seed_dependencies(&api);
        let ctx = ModuleContext::new(&api, false);

        let absent = port_policy(full_layout()).with_state(DesiredState::Absent);
        let result = reconcile_resource(&ctx, &absent).await.unwrap();
        assert!(!result.changed);
        assert!(api.mutations().is_empty());
        assert!(!api
            .journal()
            .iter()
            .any(|entry| entry.starts_with("GET /fabric/LanPinGroups")));
    }

    #[tokio::test]
    async fn test_check_mode_skips_children_of_new_policy() {
        let api = FakeIntersight::new();
        seed_dependencies(&api);
        let ctx = ModuleContext::new(&api, true);

        let result = reconcile_resource(&ctx, &port_policy(full_layout())).await.unwrap();
        assert!(result.changed);
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].action, ReconcileAction::Create);
        assert!(api.mutations().is_empty());
        assert!(!api
            .journal()
            .iter()
            .any(|entry| entry.starts_with("GET /fabric/PortModes")));
    }

    #[tokio::test]
    async fn test_missing_role_reference_keeps_applied_changes() {
        let api = FakeIntersight::new();
        api.seed(ORGANIZATIONS_PATH, json!({"Name": "default"}));
        let ctx = ModuleContext::new(&api, false);

        let err = reconcile_resource(&ctx, &port_policy(full_layout())).await.unwrap_err();
        assert!(matches!(err, IntersightError::Resolve(_)));
        assert_eq!(
            paths(&api.mutations()),
            vec!["POST /fabric/PortPolicies", "POST /fabric/PortModes"]
        );
        assert!(api.resources("/fabric/UplinkRoles").is_empty());
    }
}
