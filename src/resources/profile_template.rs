//! Server profile templates.
//!
//! The template itself is table-driven. Policies are not embedded in the
//! template body: each named policy holds the template in its `Profiles`
//! relation, so attaching means moving the template from whichever policy
//! of that type currently holds it to the named one.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{DesiredState, ResourceConfig};
use crate::engine::{ReconcileAction, ReferenceTarget};
use crate::error::Result;
use crate::intersight::{Filter, RelationMember};
use crate::reconciler::ReconcileOutcome;

use super::policy::reconcile_primary;
use super::{ModuleContext, ModuleResult};

const PROFILES: &str = "Profiles";
const TEMPLATE_OBJECT_TYPE: &str = "server.ProfileTemplate";

/// Policy types a template can be attached to, by parameter name.
const ATTACHMENTS: [(&str, ReferenceTarget); 8] = [
    (
        "adapter_config_policy",
        ReferenceTarget::new("Adapter Config Policy", "/adapter/ConfigPolicies"),
    ),
    (
        "boot_order_policy",
        ReferenceTarget::new("Boot Order Policy", "/boot/PrecisionPolicies"),
    ),
    (
        "imc_access_policy",
        ReferenceTarget::new("IMC Access Policy", "/access/Policies"),
    ),
    (
        "lan_connectivity_policy",
        ReferenceTarget::new("LAN Connectivity Policy", "/vnic/LanConnectivityPolicies"),
    ),
    (
        "local_user_policy",
        ReferenceTarget::new("Local User Policy", "/iam/EndPointUserPolicies"),
    ),
    ("ntp_policy", ReferenceTarget::new("NTP Policy", "/ntp/Policies")),
    (
        "storage_policy",
        ReferenceTarget::new("Storage Policy", "/storage/StoragePolicies"),
    ),
    (
        "virtual_media_policy",
        ReferenceTarget::new("Virtual Media Policy", "/vmedia/Policies"),
    ),
];

pub(super) async fn reconcile(ctx: &ModuleContext<'_>, config: &ResourceConfig) -> Result<ModuleResult> {
    let mut result = ModuleResult::new(config);
    let Some(outcome) = reconcile_primary(ctx, config).await? else {
        return Ok(result);
    };
    let template = outcome.moid().map(str::to_string);
    result.record_primary(outcome);

    if config.state == DesiredState::Absent {
        return Ok(result);
    }
    let Some(template) = template else {
        debug!("Template '{}' does not exist yet, skipping policy attachment", config.name);
        return Ok(result);
    };

    for (param, target) in &ATTACHMENTS {
        let Some(name) = config
            .params
            .get(*param)
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
        else {
            continue;
        };
        if let Some(step) = attach(ctx, target, name, &template).await? {
            result.record(step);
        }
    }
    Ok(result)
}

/// Moves the template into the `Profiles` relation of the named policy.
/// Returns `None` when it is already attached there or the policy does not
/// exist.
async fn attach(
    ctx: &ModuleContext<'_>,
    target: &ReferenceTarget,
    name: &str,
    template: &str,
) -> Result<Option<ReconcileOutcome>> {
    let path = target.resource_path;
    let expected = ctx.locator.locate_by_name(path, name).await?;
    let Some(expected) = expected.moid() else {
        warn!("{} '{name}' not found in {path}, not attaching", target.label);
        return Ok(None);
    };

    let holder = ctx
        .locator
        .locate(path, &Filter::new().any_equals(PROFILES, "Moid", template))
        .await?;
    if holder.moid() == Some(expected) {
        debug!("{} '{name}' already holds template {template}", target.label);
        return Ok(None);
    }

    if ctx.check_mode() {
        info!("[check] would attach template {template} to {} '{name}'", target.label);
    } else {
        if let Some(current) = holder.moid() {
            ctx.api.remove_relation(path, current, PROFILES, template).await?;
            info!("Detached template {template} from {path}/{current}");
        }
        let member = RelationMember {
            object_type: String::from(TEMPLATE_OBJECT_TYPE),
            moid: template.to_string(),
        };
        ctx.api.add_relation(path, expected, PROFILES, &[member]).await?;
        info!("Attached template {template} to {} '{name}'", target.label);
    }

    Ok(Some(ReconcileOutcome {
        resource_path: format!("{path}/{expected}/{PROFILES}"),
        action: ReconcileAction::Create,
        changed: true,
        resource: None,
    }))
}
