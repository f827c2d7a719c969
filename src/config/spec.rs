//! Manifest types for the reconciliation engine.
//!
//! This module defines the structs that map to `intersight.yaml`: the
//! connection settings and the ordered list of resources to reconcile.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::resources::ResourceKind;

/// The root manifest structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Connection settings.
    #[serde(default)]
    pub intersight: ConnectionConfig,
    /// Resources to reconcile, in order.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

/// Connection settings for the Intersight API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ConnectionConfig {
    /// API root URI.
    #[serde(default = "default_api_uri")]
    #[validate(url)]
    pub api_uri: String,
    /// Verify TLS certificates.
    #[serde(default = "default_validate_certs")]
    pub validate_certs: bool,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            api_uri: default_api_uri(),
            validate_certs: default_validate_certs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Target state of a resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// The resource must exist and match the declared fields.
    #[default]
    Present,
    /// The resource must not exist.
    Absent,
}

impl std::fmt::Display for DesiredState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// One resource entry of the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceConfig {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Natural key of the resource.
    pub name: String,
    /// Target state.
    #[serde(default)]
    pub state: DesiredState,
    /// Owning organization (organization-scoped kinds only).
    #[serde(default)]
    pub organization: Option<String>,
    /// Kind-specific parameters.
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl ResourceConfig {
    /// Creates an entry with no parameters.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            state: DesiredState::Present,
            organization: None,
            params: Map::new(),
        }
    }

    /// Sets the target state.
    #[must_use]
    pub const fn with_state(mut self, state: DesiredState) -> Self {
        self.state = state;
        self
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    /// Organization name, defaulting to `default`.
    #[must_use]
    pub fn organization(&self) -> &str {
        self.organization.as_deref().unwrap_or(DEFAULT_ORGANIZATION)
    }
}

/// Organization used when an entry names none.
pub const DEFAULT_ORGANIZATION: &str = "default";

/// Default API root.
pub const DEFAULT_API_URI: &str = "https://intersight.com/api/v1";

fn default_api_uri() -> String {
    String::from(DEFAULT_API_URI)
}

const fn default_validate_certs() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    30
}
