//! Offline manifest validation.
//!
//! Everything that can be checked without talking to Intersight is checked
//! here, so a bad manifest fails before the first remote call.

use crate::error::{ConfigError, IntersightError, Result};
use crate::resources::{validate_params, Scope};
use std::collections::HashSet;
use tracing::debug;
use validator::Validate;

use super::spec::{Manifest, ResourceConfig};

/// Validator for manifests.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if no error was found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a manifest.
    ///
    /// # Errors
    ///
    /// Returns the first error if validation fails.
    pub fn validate(&self, manifest: &Manifest) -> Result<ValidationResult> {
        let result = self.check(manifest);

        match result.errors.first() {
            None => {
                debug!("Manifest validation passed");
                Ok(result)
            }
            Some(first) => {
                let more = result.errors.len() - 1;
                let message = if more == 0 {
                    first.message.clone()
                } else {
                    format!("{} (and {more} more)", first.message)
                };
                Err(IntersightError::Config(ConfigError::ValidationError {
                    message,
                    field: Some(first.field.clone()),
                }))
            }
        }
    }

    /// Collects every error and warning without failing.
    #[must_use]
    pub fn check(&self, manifest: &Manifest) -> ValidationResult {
        let mut result = ValidationResult::default();

        if let Err(errors) = manifest.intersight.validate() {
            result.error("intersight", errors.to_string());
        }

        if manifest.resources.is_empty() {
            result.warnings.push(String::from("No resources defined in manifest"));
        }

        let mut seen = HashSet::new();
        for (i, resource) in manifest.resources.iter().enumerate() {
            let prefix = format!("resources[{i}]");

            if !seen.insert((resource.kind, resource.organization(), resource.name.as_str())) {
                result.error(
                    format!("{prefix}.name"),
                    format!("Duplicate {} '{}'", resource.kind, resource.name),
                );
            }

            Self::validate_name(resource, &prefix, &mut result);

            if let Err(err) = validate_params(resource) {
                result.error(prefix.clone(), format!("{} '{}': {err}", resource.kind, resource.name));
            }

            if resource.organization.is_some()
                && matches!(resource.kind.definition().scope, Scope::Parent(_))
            {
                result.warnings.push(format!(
                    "{prefix}.organization: ignored for {}, which is scoped to its parent",
                    resource.kind
                ));
            }
        }

        result
    }

    fn validate_name(resource: &ResourceConfig, prefix: &str, result: &mut ValidationResult) {
        let name = &resource.name;
        let max_len = resource.kind.definition().max_name_len;
        if name.is_empty() {
            result.error(format!("{prefix}.name"), "Name cannot be empty");
        } else if name.chars().count() > max_len {
            result.error(
                format!("{prefix}.name"),
                format!("Name '{name}' is longer than {max_len} characters"),
            );
        } else if !is_valid_name(name) {
            result.error(
                format!("{prefix}.name"),
                format!(
                    "Name '{name}' is invalid. Allowed characters are alphanumerics and ':', '-', '_', '.'"
                ),
            );
        }
    }
}

/// Checks the character set of an Intersight object name.
fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_' | '.'))
}
