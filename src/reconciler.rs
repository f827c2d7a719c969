//! Reconciler for a single Intersight resource.
//!
//! This module implements the idempotent present/absent state machine:
//! observe the current resource, decide one action, and issue at most one
//! mutating call. In check mode the action is decided and reported as if
//! it had been executed, but the mutating call is suppressed.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::DesiredState;
use crate::engine::ReconcileAction;
use crate::error::{ReconcileError, Result};
use crate::intersight::{DesiredSpec, Filter, IntersightApi, RemoteResource};

/// Drives one resource towards its desired state.
#[derive(Clone, Copy)]
pub struct Reconciler<'a> {
    /// Intersight endpoint.
    api: &'a dyn IntersightApi,
    /// Suppress mutating calls.
    check_mode: bool,
}

/// Result of reconciling one resource.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    /// Collection the resource lives in.
    pub resource_path: String,
    /// Action taken (or that would be taken in check mode).
    pub action: ReconcileAction,
    /// Whether the action changes remote state.
    pub changed: bool,
    /// Remote representation after the action; `None` after a delete or a
    /// suppressed create.
    pub resource: Option<RemoteResource>,
}

impl ReconcileOutcome {
    /// Moid of the resulting resource, if any.
    #[must_use]
    pub fn moid(&self) -> Option<&str> {
        self.resource.as_ref().and_then(RemoteResource::moid)
    }
}

impl std::fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.action, self.resource_path)?;
        if let Some(moid) = self.moid() {
            write!(f, " ({moid})")?;
        }
        Ok(())
    }
}

impl<'a> Reconciler<'a> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(api: &'a dyn IntersightApi) -> Self {
        Self {
            api,
            check_mode: false,
        }
    }

    /// Enables or disables check mode.
    #[must_use]
    pub const fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Returns true if mutating calls are suppressed.
    #[must_use]
    pub const fn check_mode(&self) -> bool {
        self.check_mode
    }

    /// Locates the resource matching `filter` and reconciles it.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the mutating call fails.
    pub async fn reconcile(
        &self,
        resource_path: &str,
        filter: &Filter,
        target: DesiredState,
        desired: &DesiredSpec,
    ) -> Result<ReconcileOutcome> {
        let current = self.api.get(resource_path, filter).await?;
        self.apply(resource_path, current, target, desired).await
    }

    /// Reconciles against an already observed resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutating call fails.
    pub async fn apply(
        &self,
        resource_path: &str,
        current: Option<RemoteResource>,
        target: DesiredState,
        desired: &DesiredSpec,
    ) -> Result<ReconcileOutcome> {
        let matches = current
            .as_ref()
            .is_some_and(|actual| self.api.compare(desired, actual));
        let action = ReconcileAction::decide(target, current.is_some(), matches);
        let current_moid = current.as_ref().and_then(RemoteResource::moid).map(str::to_string);

        debug!("{resource_path}: {action} (exists: {}, matches: {matches})", current.is_some());

        let outcome = |changed: bool, resource: Option<RemoteResource>| ReconcileOutcome {
            resource_path: resource_path.to_string(),
            action,
            changed,
            resource,
        };

        if self.check_mode && action.is_mutating() {
            info!("[check] would {action} {resource_path}");
            let resource = if action == ReconcileAction::Update { current } else { None };
            return Ok(outcome(true, resource));
        }

        match action {
            ReconcileAction::NoOp => Ok(outcome(false, current)),
            ReconcileAction::Create => {
                let created = self.api.create_or_update(resource_path, None, desired).await?;
                info!("Created {resource_path} ({})", created.moid().unwrap_or("?"));
                Ok(outcome(true, Some(created)))
            }
            ReconcileAction::Update => {
                let moid = Self::require_moid(resource_path, current_moid)?;
                let updated = self
                    .api
                    .create_or_update(resource_path, Some(&moid), desired)
                    .await?;
                info!("Updated {resource_path} ({moid})");
                Ok(outcome(true, Some(updated)))
            }
            ReconcileAction::Delete => {
                let moid = Self::require_moid(resource_path, current_moid)?;
                match self.api.delete(resource_path, &moid).await {
                    Ok(()) => {
                        info!("Deleted {resource_path} ({moid})");
                        Ok(outcome(true, None))
                    }
                    Err(err) if err.is_not_found() => {
                        info!("{resource_path} ({moid}) was already deleted");
                        Ok(outcome(false, None))
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    fn require_moid(resource_path: &str, moid: Option<String>) -> Result<String> {
        moid.ok_or_else(|| {
            ReconcileError::MissingIdentifier {
                resource_path: resource_path.to_string(),
            }
            .into()
        })
    }
}
