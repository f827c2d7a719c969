// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// Tests assert with unwrap freely
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Intersight Reconcile
//!
//! Declarative, idempotent reconciliation of Cisco Intersight pools,
//! policies and profiles.
//!
//! ## Overview
//!
//! Every resource in the manifest names a desired state (`present` or
//! `absent`). For each one the engine:
//!
//! 1. normalizes the manifest parameters into an Intersight request body,
//!    resolving named cross references to `{"Moid": ..}` objects;
//! 2. locates the existing resource by its natural key;
//! 3. compares desired and actual state and issues at most one create,
//!    update or delete.
//!
//! Running the same manifest twice issues no mutating call the second time.
//!
//! ## Modules
//!
//! - [`config`]: Manifest parsing and offline validation
//! - [`intersight`]: REST client and the [`intersight::IntersightApi`] seam
//! - [`engine`]: Normalizer, locator, comparison and the manifest executor
//! - [`reconciler`]: Present/absent state machine for one resource
//! - [`resources`]: Per-kind tables and composite modules
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! resources:
//!   - kind: mac_pool
//!     name: COS-MP
//!     organization: default
//!     mac_blocks:
//!       - from: "00:25:B5:00:00:00"
//!         to: "00:25:B5:00:00:FF"
//!   - kind: drive_group
//!     name: dg-1
//!     storage_policy: COS-SP
//!     raid_level: Raid1
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod intersight;
pub mod reconciler;
pub mod resources;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, Manifest, ResourceConfig};
pub use engine::{ExecutionResult, ManifestExecutor};
pub use error::{IntersightError, Result};
pub use intersight::{IntersightApi, IntersightClient};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use resources::{reconcile_resource, ModuleContext, ModuleResult, ResourceKind};
