//! Generic reconciliation engine.
//!
//! The pieces every resource kind shares:
//! - [`schema`]: declarative field tables and parameter checks
//! - [`normalize`]: manifest parameters to request bodies
//! - [`locate`]: natural-key lookups and reference resolution
//! - [`compare`]: asymmetric desired/actual comparison
//! - [`action`]: the action decided for one resource
//! - [`executor`]: runs a whole manifest

pub mod action;
pub mod compare;
pub mod executor;
pub mod locate;
pub mod normalize;
pub mod schema;

pub use action::ReconcileAction;
pub use compare::{spec_matches, values_match};
pub use executor::{ExecutionResult, ManifestExecutor, ModuleFailure};
pub use locate::{Locator, ORGANIZATIONS_PATH};
pub use normalize::{to_camel_case, Normalizer};
pub use schema::{check_params, FieldSpec, ReferenceTarget, Requirement, Shape};
