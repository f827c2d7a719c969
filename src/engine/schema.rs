//! Declarative field tables.
//!
//! Each resource kind declares its parameters once, as a slice of
//! [`FieldSpec`]. The normalizer walks the table to build request bodies
//! and the validator walks it to reject undeclared parameters.

use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

use super::normalize::to_camel_case;

/// Collection that a cross reference is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTarget {
    /// Human readable type, used in error messages.
    pub label: &'static str,
    /// Collection path, e.g. `/fcpool/Pools`.
    pub resource_path: &'static str,
}

impl ReferenceTarget {
    /// Creates a reference target.
    #[must_use]
    pub const fn new(label: &'static str, resource_path: &'static str) -> Self {
        Self {
            label,
            resource_path,
        }
    }
}

/// Whether an unresolved reference aborts the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Embedded as `{"Moid": null}` when the name does not resolve.
    Optional,
    /// Fails with a resolution error when the name does not resolve.
    Required,
}

/// Shape of a declared parameter.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    /// A literal passed through as-is.
    Scalar,
    /// A list of sub-option mappings.
    List(&'static [FieldSpec]),
    /// An embedded object, given as a mapping or a list of mappings.
    Object(&'static [FieldSpec]),
    /// A resource name resolved to `{"Moid": ..}`.
    Reference(ReferenceTarget, Requirement),
}

/// One declared parameter.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Parameter name as written in the manifest.
    pub key: &'static str,
    /// Shape of the value.
    pub shape: Shape,
}

impl FieldSpec {
    /// A scalar parameter.
    #[must_use]
    pub const fn scalar(key: &'static str) -> Self {
        Self {
            key,
            shape: Shape::Scalar,
        }
    }

    /// A list of sub-option mappings.
    #[must_use]
    pub const fn list(key: &'static str, fields: &'static [Self]) -> Self {
        Self {
            key,
            shape: Shape::List(fields),
        }
    }

    /// An embedded object.
    #[must_use]
    pub const fn object(key: &'static str, fields: &'static [Self]) -> Self {
        Self {
            key,
            shape: Shape::Object(fields),
        }
    }

    /// An optional cross reference.
    #[must_use]
    pub const fn reference(key: &'static str, target: ReferenceTarget) -> Self {
        Self {
            key,
            shape: Shape::Reference(target, Requirement::Optional),
        }
    }

    /// A cross reference that must resolve.
    #[must_use]
    pub const fn required_reference(key: &'static str, target: ReferenceTarget) -> Self {
        Self {
            key,
            shape: Shape::Reference(target, Requirement::Required),
        }
    }

    /// Field name in the remote schema.
    #[must_use]
    pub fn remote_key(&self) -> String {
        to_camel_case(self.key)
    }

    /// Finds a declared field by manifest name.
    #[must_use]
    pub fn find<'f>(fields: &'f [Self], key: &str) -> Option<&'f Self> {
        fields.iter().find(|field| field.key == key)
    }
}

/// Rejects parameters that are not declared in `fields` or `extra`.
///
/// Nested sub-option keys are checked too; the error names the full
/// parameter path.
///
/// # Errors
///
/// Returns [`ConfigError::UnsupportedParameter`] for the first unknown key,
/// or a validation error when an object parameter is given a scalar.
pub fn check_params(
    kind: &str,
    fields: &[FieldSpec],
    extra: &[&str],
    params: &Map<String, Value>,
) -> Result<()> {
    for (key, value) in params {
        if extra.contains(&key.as_str()) {
            continue;
        }
        let Some(field) = FieldSpec::find(fields, key) else {
            return Err(ConfigError::unsupported(kind, key.as_str()).into());
        };
        check_nested(kind, field, key, value)?;
    }
    Ok(())
}

fn check_nested(kind: &str, field: &FieldSpec, path: &str, value: &Value) -> Result<()> {
    let sub_fields = match field.shape {
        Shape::List(sub_fields) | Shape::Object(sub_fields) => sub_fields,
        Shape::Scalar | Shape::Reference(..) => return Ok(()),
    };

    let check_map = |map: &Map<String, Value>, prefix: &str| -> Result<()> {
        for (key, nested) in map {
            let nested_path = format!("{prefix}.{key}");
            let Some(sub_field) = FieldSpec::find(sub_fields, key) else {
                return Err(ConfigError::unsupported(kind, nested_path).into());
            };
            check_nested(kind, sub_field, &nested_path, nested)?;
        }
        Ok(())
    };

    match value {
        Value::Object(map) => check_map(map, path),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                if let Value::Object(map) = item {
                    check_map(map, &format!("{path}[{index}]"))?;
                }
            }
            Ok(())
        }
        Value::Null => Ok(()),
        other if matches!(field.shape, Shape::Object(_)) => Err(ConfigError::validation(
            format!("{kind} '{path}' must be a mapping, got {other}"),
            path,
        )
        .into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BLOCK: &[FieldSpec] = &[FieldSpec::scalar("from"), FieldSpec::scalar("to")];
    const FIELDS: &[FieldSpec] = &[
        FieldSpec::scalar("description"),
        FieldSpec::list("mac_blocks", BLOCK),
        FieldSpec::object("vlan_settings", VLAN),
    ];
    const VLAN: &[FieldSpec] = &[
        FieldSpec::scalar("allowed_vlans"),
        FieldSpec::scalar("native_vlan"),
    ];

    fn params(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_declared_params_pass() {
        let p = params(json!({
            "description": "d",
            "mac_blocks": [{"from": "a", "to": "b"}],
            "port_modes": []
        }));
        assert!(check_params("mac_pool", FIELDS, &["port_modes"], &p).is_ok());
    }

    #[test]
    fn test_unknown_top_level_param() {
        let p = params(json!({"descripton": "typo"}));
        let err = check_params("mac_pool", FIELDS, &[], &p).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: Unsupported parameter 'descripton' for mac_pool"
        );
    }

    #[test]
    fn test_unknown_nested_param() {
        let p = params(json!({"mac_blocks": [{"from": "a", "size": 4}]}));
        let err = check_params("mac_pool", FIELDS, &[], &p).unwrap_err();
        assert!(err.to_string().contains("mac_blocks[0].size"));
    }

    #[test]
    fn test_scalar_for_object_is_rejected() {
        let p = params(json!({"vlan_settings": "1-10"}));
        let err = check_params("ethernet_network_group_policy", FIELDS, &[], &p).unwrap_err();
        assert!(matches!(
            err,
            crate::error::IntersightError::Config(ConfigError::ValidationError { .. })
        ));
        assert!(err.to_string().contains("'vlan_settings' must be a mapping"));

        let p = params(json!({"vlan_settings": {"native_vlan": 1}, "mac_blocks": "a"}));
        assert!(check_params("ethernet_network_group_policy", FIELDS, &[], &p).is_ok());
    }

    #[test]
    fn test_remote_key() {
        assert_eq!(FieldSpec::scalar("ip_v4_config").remote_key(), "IpV4Config");
    }
}
