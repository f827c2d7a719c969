//! Table-driven reconciliation shared by every kind.
//!
//! The natural key is `Name` within the owning organization or parent
//! resource. The owner is resolved first; on `absent` a missing owner means
//! the resource cannot exist either.

use serde_json::Value;
use tracing::{debug, info};

use crate::config::{DesiredState, ResourceConfig};
use crate::engine::{FieldSpec, ReferenceTarget, Shape, ORGANIZATIONS_PATH};
use crate::error::{ConfigError, IntersightError, ResolveError, Result};
use crate::intersight::{DesiredSpec, Filter};
use crate::reconciler::ReconcileOutcome;

use super::{ModuleContext, ModuleResult, ResourceDefinition, Scope};

/// Resource the natural key is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Owner {
    /// Owning organization.
    Organization(String),
    /// Parent resource, named by the reference parameter `key`.
    Parent {
        key: &'static str,
        moid: String,
    },
}

impl Owner {
    const fn filter_field(&self) -> &'static str {
        match self {
            Self::Organization(_) => "Organization.Moid",
            Self::Parent { .. } => "Parent.Moid",
        }
    }

    fn moid(&self) -> &str {
        match self {
            Self::Organization(moid) | Self::Parent { moid, .. } => moid,
        }
    }
}

/// Reconciles one table-driven resource.
pub(super) async fn reconcile(ctx: &ModuleContext<'_>, config: &ResourceConfig) -> Result<ModuleResult> {
    let mut result = ModuleResult::new(config);
    if let Some(outcome) = reconcile_primary(ctx, config).await? {
        result.record_primary(outcome);
    }
    Ok(result)
}

/// Reconciles the resource named by `config` itself, without any
/// kind-specific follow-up. `None` means the owner does not exist on
/// `absent`, so there is nothing to delete.
pub(super) async fn reconcile_primary(
    ctx: &ModuleContext<'_>,
    config: &ResourceConfig,
) -> Result<Option<ReconcileOutcome>> {
    let definition = config.kind.definition();
    let Some(owner) = resolve_owner(ctx, definition, config).await? else {
        info!("{} '{}': owner does not exist, nothing to delete", config.kind, config.name);
        return Ok(None);
    };

    let filter = natural_key(&config.name, &owner);
    let desired = match config.state {
        DesiredState::Present => desired_body(ctx, definition, config, &owner).await?,
        DesiredState::Absent => DesiredSpec::new(),
    };

    let outcome = ctx
        .reconciler
        .reconcile(definition.resource_path, &filter, config.state, &desired)
        .await?;
    Ok(Some(outcome))
}

/// Resolves the organization or parent the resource belongs to.
pub(super) async fn resolve_owner(
    ctx: &ModuleContext<'_>,
    definition: &ResourceDefinition,
    config: &ResourceConfig,
) -> Result<Option<Owner>> {
    let (target, name, key) = match definition.scope {
        Scope::Organization => (
            ReferenceTarget::new("Organization", ORGANIZATIONS_PATH),
            config.organization(),
            None,
        ),
        Scope::Parent(key) => {
            let name = config
                .params
                .get(key)
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| {
                    ConfigError::validation(format!("'{key}' is required for {}", config.kind), key)
                })?;
            (parent_target(definition, key)?, name, Some(key))
        }
    };

    let reference = ctx.locator.locate_by_name(target.resource_path, name).await?;
    match (reference.moid(), key) {
        (Some(moid), None) => Ok(Some(Owner::Organization(moid.to_string()))),
        (Some(moid), Some(key)) => Ok(Some(Owner::Parent {
            key,
            moid: moid.to_string(),
        })),
        (None, _) if config.state == DesiredState::Present => {
            Err(ResolveError::not_found(target.label, name, target.resource_path).into())
        }
        (None, _) => Ok(None),
    }
}

fn parent_target(definition: &ResourceDefinition, key: &str) -> Result<ReferenceTarget> {
    match FieldSpec::find(definition.fields, key).map(|field| field.shape) {
        Some(Shape::Reference(target, _)) => Ok(target),
        _ => Err(IntersightError::internal(format!(
            "{} scope '{key}' is not a reference field",
            definition.label
        ))),
    }
}

/// `Name` plus the owner identifier.
pub(super) fn natural_key(name: &str, owner: &Owner) -> Filter {
    Filter::by_name(name).equals(owner.filter_field(), owner.moid())
}

/// Builds the request body: `Organization`, `Name`, then the declared
/// fields in table order. A parent reference is taken from the already
/// resolved owner instead of being looked up again.
async fn desired_body(
    ctx: &ModuleContext<'_>,
    definition: &ResourceDefinition,
    config: &ResourceConfig,
    owner: &Owner,
) -> Result<DesiredSpec> {
    let mut spec = DesiredSpec::new();
    if let Owner::Organization(moid) = owner {
        spec.insert_reference("Organization", moid);
    }
    spec.insert("Name", config.name.as_str());

    match owner {
        Owner::Organization(_) => {
            ctx.normalizer
                .normalize_into(&mut spec, definition.fields, &config.params)
                .await?;
        }
        Owner::Parent { key, moid } => {
            let fields: Vec<FieldSpec> = definition
                .fields
                .iter()
                .filter(|field| field.key != *key)
                .copied()
                .collect();
            ctx.normalizer
                .normalize_into(&mut spec, &fields, &config.params)
                .await?;
            if let Some(parent) = FieldSpec::find(definition.fields, key) {
                spec.insert_reference(parent.remote_key(), moid);
            }
        }
    }

    let body = Value::Object(spec.as_map().clone());
    debug!("{} body: {body}", config.kind);
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReconcileAction;
    use crate::resources::{reconcile_resource, ResourceKind};
    use crate::testing::FakeIntersight;
    use serde_json::{json, Map};

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn mac_pool() -> ResourceConfig {
        ResourceConfig::new(ResourceKind::MacPool, "COS-MP").with_params(params(json!({
            "description": "MAC pool for COS",
            "mac_blocks": [{"from": "00:25:B5:00:00:00", "to": "00:25:B5:00:00:FF"}]
        })))
    }

    #[tokio::test]
    async fn test_mac_pool_create_then_noop() {
        let api = FakeIntersight::new();
        let org = api.seed(ORGANIZATIONS_PATH, json!({"Name": "default"}));
        let ctx = ModuleContext::new(&api, false);

        let first = reconcile_resource(&ctx, &mac_pool()).await.unwrap();
        assert!(first.changed);
        assert_eq!(first.steps[0].action, ReconcileAction::Create);
        let response = first.api_response.unwrap();
        assert_eq!(response["Organization"], json!({"Moid": org}));
        assert_eq!(response["Name"], json!("COS-MP"));
        assert_eq!(
            response["MacBlocks"],
            json!([{"From": "00:25:B5:00:00:00", "To": "00:25:B5:00:00:FF"}])
        );
        assert!(response["Moid"].is_string());

        let second = reconcile_resource(&ctx, &mac_pool()).await.unwrap();
        assert!(!second.changed);
        assert_eq!(second.steps[0].action, ReconcileAction::NoOp);
        assert_eq!(api.mutations(), vec![String::from("POST /macpool/Pools")]);
    }

    #[tokio::test]
    async fn test_lookup_is_scoped_to_organization() {
        let api = FakeIntersight::new();
        let org = api.seed(ORGANIZATIONS_PATH, json!({"Name": "default"}));
        api.seed(
            "/macpool/Pools",
            json!({"Name": "COS-MP", "Organization": {"Moid": "other-org"}}),
        );
        let ctx = ModuleContext::new(&api, false);

        let result = reconcile_resource(&ctx, &mac_pool()).await.unwrap();
        assert_eq!(result.steps[0].action, ReconcileAction::Create);
        assert!(api
            .journal()
            .contains(&format!("GET /macpool/Pools Name eq 'COS-MP' and Organization.Moid eq '{org}'")));
    }

    #[tokio::test]
    async fn test_missing_organization() {
        let api = FakeIntersight::new();
        let ctx = ModuleContext::new(&api, false);

        let err = reconcile_resource(&ctx, &mac_pool()).await.unwrap_err();
        assert!(matches!(err, IntersightError::Resolve(_)));

        let absent = mac_pool().with_state(DesiredState::Absent);
        let result = reconcile_resource(&ctx, &absent).await.unwrap();
        assert!(!result.changed);
        assert!(result.steps.is_empty());
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_parameter_fails_before_any_call() {
        let api = FakeIntersight::new();
        let ctx = ModuleContext::new(&api, false);
        let config = ResourceConfig::new(ResourceKind::MacPool, "COS-MP")
            .with_params(params(json!({"mac_block": []})));

        let err = reconcile_resource(&ctx, &config).await.unwrap_err();
        assert!(matches!(err, IntersightError::Config(_)));
        assert!(api.journal().is_empty());
    }

    #[tokio::test]
    async fn test_drive_group_is_scoped_to_storage_policy() {
        let api = FakeIntersight::new();
        let policy = api.seed("/storage/StoragePolicies", json!({"Name": "sp-1"}));
        let ctx = ModuleContext::new(&api, false);
        let config = ResourceConfig::new(ResourceKind::DriveGroup, "dg-1").with_params(params(json!({
            "raid_level": "Raid1",
            "storage_policy": "sp-1",
            "virtual_drives": [{"name": "vd0", "size": 0, "expand_to_available": true}]
        })));

        let created = reconcile_resource(&ctx, &config).await.unwrap();
        let response = created.api_response.unwrap();
        assert_eq!(response["StoragePolicy"], json!({"Moid": policy}));
        assert!(response.get("Organization").is_none());
        assert_eq!(
            response["VirtualDrives"],
            json!([{"ExpandToAvailable": true, "Name": "vd0"}])
        );
        assert_eq!(
            api.journal()
                .iter()
                .filter(|entry| entry.starts_with("GET /storage/StoragePolicies"))
                .count(),
            1
        );

        let again = reconcile_resource(&ctx, &config).await.unwrap();
        assert!(!again.changed);
        assert!(api
            .journal()
            .contains(&format!("GET /storage/DriveGroups Name eq 'dg-1' and Parent.Moid eq '{policy}'")));
    }

    #[tokio::test]
    async fn test_drive_group_requires_existing_parent() {
        let api = FakeIntersight::new();
        let ctx = ModuleContext::new(&api, false);
        let config = ResourceConfig::new(ResourceKind::DriveGroup, "dg-1")
            .with_params(params(json!({"storage_policy": "missing"})));

        let err = reconcile_resource(&ctx, &config).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Resolution error: Storage Policy 'missing' not found in /storage/StoragePolicies"
        );
        assert!(api.mutations().is_empty());

        let unnamed = ResourceConfig::new(ResourceKind::DriveGroup, "dg-1");
        let err = reconcile_resource(&ctx, &unnamed).await.unwrap_err();
        assert!(matches!(err, IntersightError::Config(_)));
    }

    #[tokio::test]
    async fn test_absent_deletes_existing() {
        let api = FakeIntersight::new();
        let org = api.seed(ORGANIZATIONS_PATH, json!({"Name": "default"}));
        let moid = api.seed(
            "/macpool/Pools",
            json!({"Name": "COS-MP", "Organization": {"Moid": org}}),
        );
        let ctx = ModuleContext::new(&api, false);

        let result = reconcile_resource(&ctx, &mac_pool().with_state(DesiredState::Absent))
            .await
            .unwrap();
        assert!(result.changed);
        assert!(result.api_response.is_none());
        assert_eq!(api.mutations(), vec![format!("DELETE /macpool/Pools/{moid}")]);
    }
}
