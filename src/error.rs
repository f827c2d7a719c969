//! Error types for the Intersight reconciliation engine.
//!
//! Errors are grouped the way they surface to a caller: configuration and
//! ordering problems found before any remote call, transport and
//! authentication failures from the REST API, cross references that do not
//! resolve, and reconciliation failures of a whole resource.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the reconciliation engine.
#[derive(Debug, Error)]
pub enum IntersightError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Intersight API errors.
    #[error("Intersight API error: {0}")]
    Api(#[from] ApiError),

    /// Cross-reference resolution errors.
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manifest file was not found.
    #[error("Manifest file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The manifest could not be parsed.
    #[error("Failed to parse manifest: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Manifest validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// A parameter is not declared for the resource kind.
    #[error("Unsupported parameter '{parameter}' for {kind}")]
    UnsupportedParameter {
        /// Resource kind the parameter was given for.
        kind: String,
        /// Dotted path of the offending parameter.
        parameter: String,
    },

    /// A numeric range whose start exceeds its end.
    #[error("{field}: start {start} should be less than or equal to end {end}")]
    InvalidRange {
        /// Name of the range field.
        field: String,
        /// Range start.
        start: u32,
        /// Range end.
        end: u32,
    },
}

/// Intersight REST API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed.
    #[error("Intersight authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("Intersight API request failed: {status} - {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
        /// Trace identifier returned by Intersight, if any.
        trace_id: Option<String>,
    },

    /// Addressed resource does not exist.
    #[error("Resource not found: {resource_path}")]
    NotFound {
        /// Path of the missing resource.
        resource_path: String,
    },

    /// Network error.
    #[error("Network error communicating with Intersight: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from Intersight API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Cross-reference resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A required named resource does not exist.
    #[error("{label} '{name}' not found in {resource_path}")]
    ReferenceNotFound {
        /// Human readable resource type (e.g. "Storage Policy").
        label: String,
        /// Name that was looked up.
        name: String,
        /// Collection that was searched.
        resource_path: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reconciliation failed for a specific resource.
    #[error("Failed to reconcile {kind} '{name}': {reason}")]
    ResourceReconcileFailed {
        /// Kind of resource.
        kind: String,
        /// Name of the resource.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// A mutating call returned a resource without a Moid.
    #[error("Intersight returned no Moid for {resource_path}")]
    MissingIdentifier {
        /// Collection the resource was written to.
        resource_path: String,
    },

    /// Reconciliation was aborted.
    #[error("Reconciliation aborted: {reason}")]
    Aborted {
        /// Reason for abort.
        reason: String,
    },
}

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, IntersightError>;

impl IntersightError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the error was raised before any remote call.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if the error reports a missing remote resource.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(ApiError::NotFound { .. }))
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates an unsupported parameter error.
    #[must_use]
    pub fn unsupported(kind: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::UnsupportedParameter {
            kind: kind.into(),
            parameter: parameter.into(),
        }
    }
}

impl ApiError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>, trace_id: Option<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
            trace_id,
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl ResolveError {
    /// Creates a reference-not-found error.
    #[must_use]
    pub fn not_found(
        label: impl Into<String>,
        name: impl Into<String>,
        resource_path: impl Into<String>,
    ) -> Self {
        Self::ReferenceNotFound {
            label: label.into(),
            name: name.into(),
            resource_path: resource_path.into(),
        }
    }
}
