//! Per-kind field tables.

use crate::engine::{FieldSpec, ReferenceTarget};

use super::{ResourceDefinition, ResourceKind, Scope};

const IQN_POOLS: ReferenceTarget = ReferenceTarget::new("IQN Pool", "/iqnpool/Pools");
const IP_POOLS: ReferenceTarget = ReferenceTarget::new("IP Pool", "/ippool/Pools");
const FC_POOLS: ReferenceTarget = ReferenceTarget::new("FC Pool", "/fcpool/Pools");
const ISCSI_ADAPTER_POLICIES: ReferenceTarget =
    ReferenceTarget::new("iSCSI Adapter Policy", "/vnic/IscsiAdapterPolicies");
const ISCSI_STATIC_TARGET_POLICIES: ReferenceTarget =
    ReferenceTarget::new("iSCSI Static Target Policy", "/vnic/IscsiStaticTargetPolicies");
const FC_ADAPTER_POLICIES: ReferenceTarget =
    ReferenceTarget::new("FC Adapter Policy", "/vnic/FcAdapterPolicies");
const FC_NETWORK_POLICIES: ReferenceTarget =
    ReferenceTarget::new("FC Network Policy", "/vnic/FcNetworkPolicies");
const FC_QOS_POLICIES: ReferenceTarget =
    ReferenceTarget::new("FC QoS Policy", "/vnic/FcQosPolicies");
const SAN_CONNECTIVITY_POLICIES: ReferenceTarget =
    ReferenceTarget::new("SAN Connectivity Policy", "/vnic/SanConnectivityPolicies");
const STORAGE_POLICIES: ReferenceTarget =
    ReferenceTarget::new("Storage Policy", "/storage/StoragePolicies");

/// Longest name most Intersight objects accept.
const NAME_LEN: usize = 62;

const COMMON: [FieldSpec; 2] = [FieldSpec::scalar("description"), FieldSpec::scalar("tags")];

const ADDRESS_BLOCK: &[FieldSpec] = &[FieldSpec::scalar("from"), FieldSpec::scalar("to")];

const IP_V4_CONFIG: &[FieldSpec] = &[
    FieldSpec::scalar("gateway"),
    FieldSpec::scalar("netmask"),
    FieldSpec::scalar("primary_dns"),
    FieldSpec::scalar("secondary_dns"),
];

const IP_V6_CONFIG: &[FieldSpec] = &[
    FieldSpec::scalar("gateway"),
    FieldSpec::scalar("prefix"),
    FieldSpec::scalar("primary_dns"),
    FieldSpec::scalar("secondary_dns"),
];

const CHAP: &[FieldSpec] = &[
    FieldSpec::scalar("is_password_set"),
    FieldSpec::scalar("password"),
    FieldSpec::scalar("user_id"),
];

const VIRTUAL_DRIVE_POLICY: &[FieldSpec] = &[
    FieldSpec::scalar("access_policy"),
    FieldSpec::scalar("drive_cache"),
    FieldSpec::scalar("read_policy"),
    FieldSpec::scalar("strip_size"),
    FieldSpec::scalar("write_policy"),
];

const RETRIES: &[FieldSpec] = &[FieldSpec::scalar("retries"), FieldSpec::scalar("timeout")];

const QUEUE: &[FieldSpec] = &[FieldSpec::scalar("count"), FieldSpec::scalar("ring_size")];

static MAC_POOL: ResourceDefinition = ResourceDefinition {
    label: "MAC Pool",
    resource_path: "/macpool/Pools",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[COMMON[0], COMMON[1], FieldSpec::list("mac_blocks", ADDRESS_BLOCK)],
    extra_params: &[],
};

static FC_POOL: ResourceDefinition = ResourceDefinition {
    label: "FC Pool",
    resource_path: "/fcpool/Pools",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::list("id_blocks", ADDRESS_BLOCK),
        FieldSpec::scalar("pool_purpose"),
    ],
    extra_params: &[],
};

static IP_POOL: ResourceDefinition = ResourceDefinition {
    label: "IP Pool",
    resource_path: "/ippool/Pools",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::list("ip_v4_blocks", ADDRESS_BLOCK),
        FieldSpec::object("ip_v4_config", IP_V4_CONFIG),
        FieldSpec::list("ip_v6_blocks", ADDRESS_BLOCK),
        FieldSpec::object("ip_v6_config", IP_V6_CONFIG),
    ],
    extra_params: &[],
};

static ISCSI_ADAPTER_POLICY: ResourceDefinition = ResourceDefinition {
    label: "iSCSI Adapter Policy",
    resource_path: "/vnic/IscsiAdapterPolicies",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::scalar("connection_time_out"),
        FieldSpec::scalar("dhcp_timeout"),
        FieldSpec::scalar("lun_busy_retry_count"),
    ],
    extra_params: &[],
};

static FC_ZONE_POLICY: ResourceDefinition = ResourceDefinition {
    label: "FC Zone Policy",
    resource_path: "/fabric/FcZonePolicies",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::list(
            "fc_target_members",
            &[
                FieldSpec::scalar("name"),
                FieldSpec::scalar("switch_id"),
                FieldSpec::scalar("vsan_id"),
                FieldSpec::scalar("wwpn"),
            ],
        ),
        FieldSpec::scalar("fc_target_zoning_type"),
    ],
    extra_params: &[],
};

static ETHERNET_NETWORK_GROUP_POLICY: ResourceDefinition = ResourceDefinition {
    label: "Ethernet Network Group Policy",
    resource_path: "/fabric/EthNetworkGroupPolicies",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::object(
            "vlan_settings",
            &[FieldSpec::scalar("allowed_vlans"), FieldSpec::scalar("native_vlan")],
        ),
    ],
    extra_params: &[],
};

static LAN_CONNECTIVITY_POLICY: ResourceDefinition = ResourceDefinition {
    label: "LAN Connectivity Policy",
    resource_path: "/vnic/LanConnectivityPolicies",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::scalar("azure_qos_enabled"),
        FieldSpec::scalar("iqn_allocation_type"),
        FieldSpec::scalar("placement_mode"),
        FieldSpec::scalar("static_iqn_name"),
        FieldSpec::scalar("target_platform"),
        FieldSpec::reference("iqn_pool", IQN_POOLS),
    ],
    extra_params: &[],
};

static FC_NETWORK_POLICY: ResourceDefinition = ResourceDefinition {
    label: "FC Network Policy",
    resource_path: "/vnic/FcNetworkPolicies",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::object(
            "vsan_settings",
            &[FieldSpec::scalar("default_vlan_id"), FieldSpec::scalar("id")],
        ),
    ],
    extra_params: &[],
};

static NETWORK_CONNECTIVITY_POLICY: ResourceDefinition = ResourceDefinition {
    label: "Network Connectivity Policy",
    resource_path: "/networkconfig/Policies",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::scalar("alternate_ipv4dns_server"),
        FieldSpec::scalar("alternate_ipv6dns_server"),
        FieldSpec::scalar("dynamic_dns_domain"),
        FieldSpec::scalar("enable_dynamic_dns"),
        FieldSpec::scalar("enable_ipv4dns_from_dhcp"),
        FieldSpec::scalar("enable_ipv6"),
        FieldSpec::scalar("enable_ipv6dns_from_dhcp"),
        FieldSpec::scalar("preferred_ipv4dns_server"),
        FieldSpec::scalar("preferred_ipv6dns_server"),
    ],
    extra_params: &[],
};

static SAN_CONNECTIVITY_POLICY: ResourceDefinition = ResourceDefinition {
    label: "SAN Connectivity Policy",
    resource_path: "/vnic/SanConnectivityPolicies",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::scalar("target_platform"),
        FieldSpec::scalar("static_wwnn_address"),
        FieldSpec::scalar("placement_mode"),
        FieldSpec::scalar("wwnn_address_type"),
        FieldSpec::reference("wwnn_pool", FC_POOLS),
    ],
    extra_params: &[],
};

static FC_ADAPTER_POLICY: ResourceDefinition = ResourceDefinition {
    label: "FC Adapter Policy",
    resource_path: "/vnic/FcAdapterPolicies",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::scalar("error_detection_timeout"),
        FieldSpec::object(
            "error_recovery_settings",
            &[
                FieldSpec::scalar("enabled"),
                FieldSpec::scalar("io_retry_count"),
                FieldSpec::scalar("io_retry_timeout"),
                FieldSpec::scalar("link_down_timeout"),
                FieldSpec::scalar("port_down_timeout"),
            ],
        ),
        FieldSpec::object("flogi_settings", RETRIES),
        FieldSpec::object("interrupt_settings", &[FieldSpec::scalar("mode")]),
        FieldSpec::scalar("io_throttle_count"),
        FieldSpec::scalar("lun_count"),
        FieldSpec::scalar("lun_queue_depth"),
        FieldSpec::object("plogi_settings", RETRIES),
        FieldSpec::scalar("resource_allocation_timeout"),
        FieldSpec::object("rx_queue_settings", QUEUE),
        FieldSpec::object("scsi_queue_settings", QUEUE),
        FieldSpec::object("tx_queue_settings", QUEUE),
    ],
    extra_params: &[],
};

static ISCSI_BOOT_POLICY: ResourceDefinition = ResourceDefinition {
    label: "iSCSI Boot Policy",
    resource_path: "/vnic/IscsiBootPolicies",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::scalar("auto_targetvendor_name"),
        FieldSpec::object("chap", CHAP),
        FieldSpec::scalar("initiator_ip_source"),
        FieldSpec::scalar("initiator_static_ip_v4_address"),
        FieldSpec::object("initiator_static_ip_v4_config", IP_V4_CONFIG),
        FieldSpec::object("mutual_chap", CHAP),
        FieldSpec::scalar("target_source_type"),
        FieldSpec::reference("initiator_ip_pool", IP_POOLS),
        FieldSpec::reference("iscsi_adapter_policy", ISCSI_ADAPTER_POLICIES),
        FieldSpec::reference("primary_target_policy", ISCSI_STATIC_TARGET_POLICIES),
        FieldSpec::reference("secondary_target_policy", ISCSI_STATIC_TARGET_POLICIES),
    ],
    extra_params: &[],
};

static STORAGE_POLICY: ResourceDefinition = ResourceDefinition {
    label: "Storage Policy",
    resource_path: "/storage/StoragePolicies",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[
        COMMON[0],
        COMMON[1],
        FieldSpec::scalar("default_drive_mode"),
        FieldSpec::scalar("global_hot_spares"),
        FieldSpec::object(
            "m2_virtual_drive",
            &[FieldSpec::scalar("controller_slot"), FieldSpec::scalar("enable")],
        ),
        FieldSpec::object(
            "raid0_drive",
            &[
                FieldSpec::scalar("drive_slots"),
                FieldSpec::scalar("enable"),
                FieldSpec::object("virtual_drive_policy", VIRTUAL_DRIVE_POLICY),
            ],
        ),
        FieldSpec::scalar("secure_jbods"),
        FieldSpec::scalar("unused_disks_state"),
        FieldSpec::scalar("use_jbod_for_vd_creation"),
    ],
    extra_params: &[],
};

static DRIVE_GROUP: ResourceDefinition = ResourceDefinition {
    label: "Drive Group",
    resource_path: "/storage/DriveGroups",
    scope: Scope::Parent("storage_policy"),
    max_name_len: 64,
    fields: &[
        COMMON[1],
        FieldSpec::object(
            "manual_drive_group",
            &[
                FieldSpec::scalar("dedicated_hot_spares"),
                FieldSpec::list("span_groups", &[FieldSpec::scalar("slots")]),
            ],
        ),
        FieldSpec::scalar("raid_level"),
        FieldSpec::scalar("secure_drive_group"),
        FieldSpec::list(
            "virtual_drives",
            &[
                FieldSpec::scalar("boot_drive"),
                FieldSpec::scalar("expand_to_available"),
                FieldSpec::scalar("name"),
                FieldSpec::scalar("size"),
                FieldSpec::object("virtual_drive_policy", VIRTUAL_DRIVE_POLICY),
            ],
        ),
        FieldSpec::required_reference("storage_policy", STORAGE_POLICIES),
    ],
    extra_params: &[],
};

static VIRTUAL_FC_INTERFACE: ResourceDefinition = ResourceDefinition {
    label: "Virtual FC Interface",
    resource_path: "/vnic/FcIfs",
    scope: Scope::Parent("san_connectivity_policy"),
    max_name_len: 31,
    fields: &[
        COMMON[1],
        FieldSpec::scalar("order"),
        FieldSpec::scalar("persistent_bindings"),
        FieldSpec::scalar("pin_group_name"),
        FieldSpec::object(
            "placement",
            &[
                FieldSpec::scalar("auto_pci_link"),
                FieldSpec::scalar("auto_slot_id"),
                FieldSpec::scalar("id"),
                FieldSpec::scalar("pci_link"),
                FieldSpec::scalar("pci_link_assignment_mode"),
                FieldSpec::scalar("switch_id"),
                FieldSpec::scalar("uplink"),
            ],
        ),
        FieldSpec::scalar("static_wwpn_address"),
        FieldSpec::scalar("type"),
        FieldSpec::scalar("wwpn_address_type"),
        FieldSpec::reference("fc_adapter_policy", FC_ADAPTER_POLICIES),
        FieldSpec::reference("fc_network_policy", FC_NETWORK_POLICIES),
        FieldSpec::reference("fc_qos_policy", FC_QOS_POLICIES),
        FieldSpec::required_reference("san_connectivity_policy", SAN_CONNECTIVITY_POLICIES),
        FieldSpec::reference("wwpn_pool", FC_POOLS),
    ],
    extra_params: &[],
};

static SERVER_PROFILE_TEMPLATE: ResourceDefinition = ResourceDefinition {
    label: "Server Profile Template",
    resource_path: "/server/ProfileTemplates",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[COMMON[0], COMMON[1], FieldSpec::scalar("target_platform")],
    extra_params: &[
        "adapter_config_policy",
        "boot_order_policy",
        "imc_access_policy",
        "lan_connectivity_policy",
        "local_user_policy",
        "ntp_policy",
        "storage_policy",
        "virtual_media_policy",
    ],
};

static FABRIC_PORT_POLICY: ResourceDefinition = ResourceDefinition {
    label: "Port Policy",
    resource_path: "/fabric/PortPolicies",
    scope: Scope::Organization,
    max_name_len: NAME_LEN,
    fields: &[COMMON[0], COMMON[1], FieldSpec::scalar("device_model")],
    extra_params: &["port_modes", "port_roles", "port_channels", "pin_groups"],
};

pub(super) fn definition(kind: ResourceKind) -> &'static ResourceDefinition {
    match kind {
        ResourceKind::MacPool => &MAC_POOL,
        ResourceKind::FcPool => &FC_POOL,
        ResourceKind::IpPool => &IP_POOL,
        ResourceKind::IscsiAdapterPolicy => &ISCSI_ADAPTER_POLICY,
        ResourceKind::FcZonePolicy => &FC_ZONE_POLICY,
        ResourceKind::EthernetNetworkGroupPolicy => &ETHERNET_NETWORK_GROUP_POLICY,
        ResourceKind::LanConnectivityPolicy => &LAN_CONNECTIVITY_POLICY,
        ResourceKind::FcNetworkPolicy => &FC_NETWORK_POLICY,
        ResourceKind::NetworkConnectivityPolicy => &NETWORK_CONNECTIVITY_POLICY,
        ResourceKind::SanConnectivityPolicy => &SAN_CONNECTIVITY_POLICY,
        ResourceKind::FcAdapterPolicy => &FC_ADAPTER_POLICY,
        ResourceKind::IscsiBootPolicy => &ISCSI_BOOT_POLICY,
        ResourceKind::StoragePolicy => &STORAGE_POLICY,
        ResourceKind::DriveGroup => &DRIVE_GROUP,
        ResourceKind::VirtualFcInterface => &VIRTUAL_FC_INTERFACE,
        ResourceKind::ServerProfileTemplate => &SERVER_PROFILE_TEMPLATE,
        ResourceKind::FabricPortPolicy => &FABRIC_PORT_POLICY,
    }
}
