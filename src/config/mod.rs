//! Manifest handling.
//!
//! This module handles everything about `intersight.yaml`:
//! - Parsing and deserializing the manifest
//! - Environment overrides and the API token
//! - Offline validation of every entry

mod parser;
mod spec;
mod validator;

pub use parser::{find_config_file, ConfigParser, API_TOKEN_VAR, DEFAULT_CONFIG_FILES};
pub use spec::{
    ConnectionConfig, DesiredState, Manifest, ResourceConfig, DEFAULT_API_URI,
    DEFAULT_ORGANIZATION,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
