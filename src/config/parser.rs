//! Manifest loading.
//!
//! The manifest is read from YAML, the `.env` file next to it is loaded,
//! and connection settings may be overridden from the environment.

use crate::error::{ConfigError, IntersightError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::Manifest;

/// Environment variable holding the API bearer token.
pub const API_TOKEN_VAR: &str = "INTERSIGHT_API_TOKEN";

const API_URI_VAR: &str = "INTERSIGHT_API_URI";
const VALIDATE_CERTS_VAR: &str = "INTERSIGHT_VALIDATE_CERTS";
const TIMEOUT_SECS_VAR: &str = "INTERSIGHT_TIMEOUT_SECS";

/// Loads manifests from disk.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Directory searched for `.env`.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for `.env`.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let path = path.as_ref();
        info!("Loading manifest from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a manifest from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or names an unknown kind.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Manifest> {
        let manifest: Manifest = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: format!("YAML parse error: {e}"),
            location: source.map(|p| p.display().to_string()),
        })?;

        debug!("Parsed manifest with {} resources", manifest.resources.len());
        Ok(manifest)
    }

    /// Loads a manifest and applies environment overrides to its
    /// connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an
    /// override is malformed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let mut manifest = self.load_file(path)?;
        Self::apply_env_overrides(&mut manifest)?;
        Ok(manifest)
    }

    fn apply_env_overrides(manifest: &mut Manifest) -> Result<()> {
        let connection = &mut manifest.intersight;

        if let Ok(uri) = std::env::var(API_URI_VAR) {
            debug!("Overriding intersight.api_uri from environment");
            connection.api_uri = uri;
        }

        if let Ok(flag) = std::env::var(VALIDATE_CERTS_VAR) {
            debug!("Overriding intersight.validate_certs from environment");
            connection.validate_certs = flag.parse().map_err(|_| {
                ConfigError::validation(
                    format!("{VALIDATE_CERTS_VAR} must be true or false, got '{flag}'"),
                    "intersight.validate_certs",
                )
            })?;
        }

        if let Ok(timeout) = std::env::var(TIMEOUT_SECS_VAR) {
            debug!("Overriding intersight.timeout_secs from environment");
            connection.timeout_secs = timeout.parse().map_err(|_| {
                ConfigError::validation(
                    format!("{TIMEOUT_SECS_VAR} must be a number of seconds, got '{timeout}'"),
                    "intersight.timeout_secs",
                )
            })?;
        }

        Ok(())
    }

    /// Loads the `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to load .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Reads the API bearer token from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not set.
    pub fn api_token() -> Result<String> {
        std::env::var(API_TOKEN_VAR).map_err(|_| {
            IntersightError::Config(ConfigError::MissingEnvVar {
                name: String::from(API_TOKEN_VAR),
            })
        })
    }
}

/// Manifest file names searched for, in order.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "intersight.yaml",
    "intersight.yml",
    "manifest.yaml",
    "manifest.yml",
];

/// Finds a manifest in `start_dir` or one of its parents.
///
/// # Errors
///
/// Returns an error if no manifest is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found manifest: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }
    .into())
}
