//! Intersight API types.
//!
//! Remote resources are kept as opaque JSON objects: only `Moid` and
//! `ObjectType` are interpreted, every other field is passed through.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A resource as returned by Intersight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteResource {
    fields: Map<String, Value>,
}

impl RemoteResource {
    /// Wraps a JSON object.
    #[must_use]
    pub const fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Service-assigned unique identifier.
    #[must_use]
    pub fn moid(&self) -> Option<&str> {
        self.fields.get("Moid").and_then(Value::as_str)
    }

    /// Type discriminant, e.g. `macpool.Pool`.
    #[must_use]
    pub fn object_type(&self) -> Option<&str> {
        self.fields.get("ObjectType").and_then(Value::as_str)
    }

    /// Returns a field by its remote name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Converts the resource into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Request body produced by normalization, keyed by remote field names.
///
/// Insertion order is preserved so bodies read the same way they are
/// declared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredSpec {
    fields: Map<String, Value>,
}

impl DesiredSpec {
    /// Creates an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a field unconditionally.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Inserts a field unless its value is falsy.
    ///
    /// `null`, `false`, `0`, `""`, `[]` and `{}` are all treated as absent.
    pub fn insert_if_present(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let value = value.into();
        if !is_falsy(&value) {
            self.fields.insert(key.into(), value);
        }
    }

    /// Inserts a `{"Moid": ..}` reference.
    pub fn insert_reference(&mut self, key: impl Into<String>, moid: &str) {
        self.insert(key, ResourceReference::found(moid).to_body());
    }

    /// Returns a field by its remote name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns true if the body holds the given field.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Converts the body into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for DesiredSpec {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Outcome of locating a named resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReference {
    moid: Option<String>,
}

impl ResourceReference {
    /// A reference to an existing resource.
    #[must_use]
    pub fn found(moid: impl Into<String>) -> Self {
        Self {
            moid: Some(moid.into()),
        }
    }

    /// A reference that did not resolve.
    #[must_use]
    pub const fn missing() -> Self {
        Self { moid: None }
    }

    /// The resolved identifier, if any.
    #[must_use]
    pub fn moid(&self) -> Option<&str> {
        self.moid.as_deref()
    }

    /// Returns true if the reference resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.moid.is_some()
    }

    /// Renders the reference as an embedded `{"Moid": ..}` object.
    #[must_use]
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            String::from("Moid"),
            self.moid.clone().map_or(Value::Null, Value::String),
        );
        Value::Object(body)
    }
}

/// A member posted to a relation collection such as `Profiles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMember {
    /// Object type of the member, e.g. `server.ProfileTemplate`.
    #[serde(rename = "ObjectType")]
    pub object_type: String,
    /// Identifier of the member.
    #[serde(rename = "Moid")]
    pub moid: String,
}

/// Envelope of Intersight list responses.
#[derive(Debug, Deserialize)]
pub struct ListResponse {
    /// Matching resources.
    #[serde(rename = "Results", default)]
    pub results: Option<Vec<RemoteResource>>,
}

/// Returns true if the value counts as "not given".
#[must_use]
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n == 0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}
