//! Spec normalizer.
//!
//! Turns manifest parameters (snake_case keys, nested sub-options, names of
//! other resources) into a request body in the remote schema:
//!
//! - keys are renamed to CamelCase,
//! - falsy scalars (`false`, `0`, `""`, empty lists, `null`) are dropped,
//!   so a boolean can never be explicitly reset to `false`,
//! - a declared list or object that is present always yields at least an
//!   empty placeholder,
//! - cross references are resolved to `{"Moid": ..}`.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ConfigError, IntersightError, ResolveError, Result};
use crate::intersight::{is_falsy, DesiredSpec, ResourceReference};

use super::locate::Locator;
use super::schema::{FieldSpec, ReferenceTarget, Requirement, Shape};

/// Converts `snake_case` to `CamelCase` (`ip_v4_blocks` -> `IpV4Blocks`).
#[must_use]
pub fn to_camel_case(key: &str) -> String {
    key.to_lowercase()
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect()
}

/// Builds request bodies from declared field tables.
#[derive(Clone, Copy)]
pub struct Normalizer<'a> {
    locator: Locator<'a>,
}

impl<'a> Normalizer<'a> {
    /// Creates a normalizer resolving references through `locator`.
    #[must_use]
    pub const fn new(locator: Locator<'a>) -> Self {
        Self { locator }
    }

    /// Normalizes `params` against `fields` into a new body.
    ///
    /// # Errors
    ///
    /// Returns an error if a required reference does not resolve or a
    /// lookup fails.
    pub async fn normalize(
        &self,
        fields: &[FieldSpec],
        params: &Map<String, Value>,
    ) -> Result<DesiredSpec> {
        let mut spec = DesiredSpec::new();
        self.normalize_into(&mut spec, fields, params).await?;
        Ok(spec)
    }

    /// Appends the normalized `params` to an existing body.
    ///
    /// # Errors
    ///
    /// Returns an error if a required reference does not resolve or a
    /// lookup fails.
    pub async fn normalize_into(
        &self,
        spec: &mut DesiredSpec,
        fields: &[FieldSpec],
        params: &Map<String, Value>,
    ) -> Result<()> {
        for field in fields {
            let Some(value) = params.get(field.key) else {
                continue;
            };

            if let Shape::Reference(target, requirement) = field.shape {
                if let Some(reference) = self.resolve(&target, requirement, value).await? {
                    spec.insert(field.remote_key(), reference.to_body());
                }
            } else if let Some(value) = shape_value(field, value)? {
                spec.insert(field.remote_key(), value);
            }
        }
        Ok(())
    }

    /// Resolves a reference parameter. An empty name means "not given".
    async fn resolve(
        &self,
        target: &ReferenceTarget,
        requirement: Requirement,
        value: &Value,
    ) -> Result<Option<ResourceReference>> {
        let Some(name) = value.as_str().filter(|name| !name.is_empty()) else {
            return Ok(None);
        };

        let reference = self
            .locator
            .locate_by_name(target.resource_path, name)
            .await?;

        if !reference.is_resolved() {
            match requirement {
                Requirement::Required => {
                    return Err(
                        ResolveError::not_found(target.label, name, target.resource_path).into(),
                    );
                }
                Requirement::Optional => {
                    warn!("{} '{name}' not found in {}", target.label, target.resource_path);
                }
            }
        }

        Ok(Some(reference))
    }
}

/// Normalizes a non-reference value. `None` means "omit".
fn shape_value(field: &FieldSpec, value: &Value) -> Result<Option<Value>> {
    match field.shape {
        Shape::Scalar => Ok((!is_falsy(value)).then(|| value.clone())),
        Shape::List(sub_fields) => {
            let items: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                Value::Null => Vec::new(),
                other => vec![other],
            };
            let mut normalized = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Object(map) => {
                        let mut object = Map::new();
                        merge_object(sub_fields, map, &mut object)?;
                        normalized.push(Value::Object(object));
                    }
                    other if !is_falsy(other) => normalized.push(other.clone()),
                    _ => {}
                }
            }
            Ok(Some(Value::Array(normalized)))
        }
        Shape::Object(sub_fields) => {
            let mut object = Map::new();
            match value {
                Value::Object(map) => merge_object(sub_fields, map, &mut object)?,
                Value::Array(items) => {
                    for item in items {
                        if let Value::Object(map) = item {
                            merge_object(sub_fields, map, &mut object)?;
                        }
                    }
                }
                Value::Null => {}
                other => {
                    return Err(ConfigError::validation(
                        format!("'{}' must be a mapping, got {other}", field.key),
                        field.key,
                    )
                    .into());
                }
            }
            Ok(Some(Value::Object(object)))
        }
        Shape::Reference(..) => Err(IntersightError::internal(format!(
            "cross reference '{}' is only supported at the top level",
            field.key
        ))),
    }
}

fn merge_object(
    fields: &[FieldSpec],
    params: &Map<String, Value>,
    out: &mut Map<String, Value>,
) -> Result<()> {
    for field in fields {
        if let Some(value) = params.get(field.key) {
            if let Some(value) = shape_value(field, value)? {
                out.insert(field.remote_key(), value);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeIntersight;
    use serde_json::json;

    const POOL: ReferenceTarget = ReferenceTarget::new("IQN Pool", "/iqnpool/Pools");
    const PARENT: ReferenceTarget = ReferenceTarget::new("Storage Policy", "/storage/StoragePolicies");

    const BLOCK: &[FieldSpec] = &[FieldSpec::scalar("from"), FieldSpec::scalar("to")];
    const POLICY: &[FieldSpec] = &[
        FieldSpec::scalar("read_policy"),
        FieldSpec::scalar("strip_size"),
    ];
    const DRIVE: &[FieldSpec] = &[
        FieldSpec::scalar("name"),
        FieldSpec::scalar("boot_drive"),
        FieldSpec::object("virtual_drive_policy", POLICY),
    ];
    const FIELDS: &[FieldSpec] = &[
        FieldSpec::scalar("description"),
        FieldSpec::scalar("enabled"),
        FieldSpec::list("mac_blocks", BLOCK),
        FieldSpec::object("vlan_settings", &[
            FieldSpec::scalar("allowed_vlans"),
            FieldSpec::scalar("native_vlan"),
        ]),
        FieldSpec::list("virtual_drives", DRIVE),
        FieldSpec::reference("iqn_pool", POOL),
        FieldSpec::required_reference("storage_policy", PARENT),
    ];

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("mac_blocks"), "MacBlocks");
        assert_eq!(to_camel_case("ip_v4_config"), "IpV4Config");
        assert_eq!(to_camel_case("m2_virtual_drive"), "M2VirtualDrive");
        assert_eq!(to_camel_case("alternate_ipv4dns_server"), "AlternateIpv4dnsServer");
        assert_eq!(to_camel_case("from"), "From");
    }

    #[tokio::test]
    async fn test_falsy_scalars_are_omitted() {
        let api = FakeIntersight::new();
        let normalizer = Normalizer::new(Locator::new(&api));

        for value in [json!(false), json!(0), json!(""), json!(null)] {
            let p = params(json!({"enabled": value}));
            let spec = normalizer.normalize(FIELDS, &p).await.unwrap();
            assert!(!spec.contains_key("Enabled"), "{p:?} should omit Enabled");
        }
        let spec = normalizer.normalize(FIELDS, &Map::new()).await.unwrap();
        assert!(spec.is_empty());

        let spec = normalizer
            .normalize(FIELDS, &params(json!({"enabled": true})))
            .await
            .unwrap();
        assert_eq!(spec.get("Enabled"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_list_placeholder_and_nested_rename() {
        let api = FakeIntersight::new();
        let normalizer = Normalizer::new(Locator::new(&api));

        let spec = normalizer
            .normalize(FIELDS, &params(json!({"mac_blocks": null})))
            .await
            .unwrap();
        assert_eq!(spec.get("MacBlocks"), Some(&json!([])));

        let p = params(json!({
            "mac_blocks": [{"from": "00:25:B5:00:00:00", "to": "00:25:B5:00:00:FF"}],
            "virtual_drives": [{
                "name": "vd0",
                "boot_drive": false,
                "virtual_drive_policy": {"read_policy": "Default", "strip_size": 0}
            }]
        }));
        let spec = normalizer.normalize(FIELDS, &p).await.unwrap();
        assert_eq!(
            spec.into_value(),
            json!({
                "MacBlocks": [{"From": "00:25:B5:00:00:00", "To": "00:25:B5:00:00:FF"}],
                "VirtualDrives": [{"Name": "vd0", "VirtualDrivePolicy": {"ReadPolicy": "Default"}}]
            })
        );
    }

    #[tokio::test]
    async fn test_object_merges_list_of_mappings() {
        let api = FakeIntersight::new();
        let normalizer = Normalizer::new(Locator::new(&api));

        let p = params(json!({"vlan_settings": [{"allowed_vlans": "1-10"}, {"native_vlan": 1}]}));
        let spec = normalizer.normalize(FIELDS, &p).await.unwrap();
        assert_eq!(
            spec.get("VlanSettings"),
            Some(&json!({"AllowedVlans": "1-10", "NativeVlan": 1}))
        );
    }

    #[tokio::test]
    async fn test_object_rejects_scalar() {
        let api = FakeIntersight::new();
        let normalizer = Normalizer::new(Locator::new(&api));

        let p = params(json!({"vlan_settings": "1-10"}));
        let err = normalizer.normalize(FIELDS, &p).await.unwrap_err();
        assert!(err.is_local());
    }

    #[tokio::test]
    async fn test_references_are_resolved() {
        let api = FakeIntersight::new();
        let pool = api.seed("/iqnpool/Pools", json!({"Name": "iqn-a"}));
        let parent = api.seed("/storage/StoragePolicies", json!({"Name": "sp-1"}));
        let normalizer = Normalizer::new(Locator::new(&api));

        let p = params(json!({"iqn_pool": "iqn-a", "storage_policy": "sp-1"}));
        let spec = normalizer.normalize(FIELDS, &p).await.unwrap();
        assert_eq!(spec.get("IqnPool"), Some(&json!({"Moid": pool})));
        assert_eq!(spec.get("StoragePolicy"), Some(&json!({"Moid": parent})));
    }

    #[tokio::test]
    async fn test_optional_reference_not_found_embeds_null() {
        let api = FakeIntersight::new();
        let normalizer = Normalizer::new(Locator::new(&api));

        let spec = normalizer
            .normalize(FIELDS, &params(json!({"iqn_pool": "missing"})))
            .await
            .unwrap();
        assert_eq!(spec.get("IqnPool"), Some(&json!({"Moid": null})));
    }

    #[tokio::test]
    async fn test_required_reference_not_found_fails() {
        let api = FakeIntersight::new();
        let normalizer = Normalizer::new(Locator::new(&api));

        let err = normalizer
            .normalize(FIELDS, &params(json!({"storage_policy": "missing"})))
            .await
            .unwrap_err();
        assert!(matches!(err, IntersightError::Resolve(_)));
        assert!(api.mutations().is_empty());
    }

    #[tokio::test]
    async fn test_empty_reference_name_skips_lookup() {
        let api = FakeIntersight::new();
        let normalizer = Normalizer::new(Locator::new(&api));

        let spec = normalizer
            .normalize(FIELDS, &params(json!({"iqn_pool": ""})))
            .await
            .unwrap();
        assert!(spec.is_empty());
        assert!(api.journal().is_empty());
    }
}
