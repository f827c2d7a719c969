//! Reconciliation actions.
//!
//! The decision table maps a target state and the observed resource onto
//! exactly one action.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::DesiredState;

/// The corrective action chosen for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    /// Create the resource.
    Create,
    /// Update the existing resource in place.
    Update,
    /// Delete the existing resource.
    Delete,
    /// Nothing to do.
    NoOp,
}

impl ReconcileAction {
    /// Decides the action for a resource.
    ///
    /// `matches` is only consulted when the target is present and the
    /// resource exists.
    #[must_use]
    pub const fn decide(target: DesiredState, exists: bool, matches: bool) -> Self {
        match (target, exists) {
            (DesiredState::Present, false) => Self::Create,
            (DesiredState::Present, true) => {
                if matches {
                    Self::NoOp
                } else {
                    Self::Update
                }
            }
            (DesiredState::Absent, true) => Self::Delete,
            (DesiredState::Absent, false) => Self::NoOp,
        }
    }

    /// Returns true if the action issues a mutating call.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::NoOp)
    }

    /// Short verb used in logs and tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::NoOp => "no-op",
        }
    }
}

impl fmt::Display for ReconcileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
