//! Manifest executor.
//!
//! Entries are reconciled one at a time, in manifest order. A failed entry
//! stops the run unless `continue_on_error` is set; changes applied by
//! earlier entries are kept either way.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Manifest;
use crate::error::{ReconcileError, Result};
use crate::intersight::IntersightApi;
use crate::resources::{reconcile_resource, ModuleContext, ModuleResult, ResourceKind};

/// Runs every entry of a manifest against one Intersight endpoint.
pub struct ManifestExecutor<'a> {
    /// Intersight endpoint.
    api: &'a dyn IntersightApi,
    /// Suppress mutating calls.
    check_mode: bool,
    /// Keep going after a failed entry.
    continue_on_error: bool,
}

/// A manifest entry that failed.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleFailure {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name.
    pub name: String,
    /// Error message.
    pub message: String,
}

/// Report of one manifest run.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Identifier of the run, for correlating logs.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Whether mutating calls were suppressed.
    pub check_mode: bool,
    /// Results of the entries that completed.
    pub results: Vec<ModuleResult>,
    /// Entries that failed.
    pub failures: Vec<ModuleFailure>,
    /// Entries not attempted after a failure.
    pub skipped: usize,
    /// Whether every entry succeeded.
    pub success: bool,
}

impl ExecutionResult {
    /// Number of entries that changed remote state.
    #[must_use]
    pub fn changed(&self) -> usize {
        self.results.iter().filter(|result| result.changed).count()
    }

    /// Turns a failed run into an error. A single failure is reported with
    /// its resource; several are summarized.
    ///
    /// # Errors
    ///
    /// Returns a [`ReconcileError`] if any entry failed.
    pub fn outcome(&self) -> Result<()> {
        match self.failures.as_slice() {
            [] => Ok(()),
            [failure] => Err(ReconcileError::ResourceReconcileFailed {
                kind: failure.kind.to_string(),
                name: failure.name.clone(),
                reason: failure.message.clone(),
            }
            .into()),
            failures => Err(ReconcileError::Aborted {
                reason: format!("{} resources failed", failures.len()),
            }
            .into()),
        }
    }
}

impl<'a> ManifestExecutor<'a> {
    /// Creates an executor that applies changes.
    #[must_use]
    pub const fn new(api: &'a dyn IntersightApi) -> Self {
        Self {
            api,
            check_mode: false,
            continue_on_error: false,
        }
    }

    /// Sets check mode.
    #[must_use]
    pub const fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    /// Sets whether to continue after a failed entry.
    #[must_use]
    pub const fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Reconciles every entry of `manifest`.
    ///
    /// Entry failures are reported in the result rather than returned.
    pub async fn execute(&self, manifest: &Manifest) -> ExecutionResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let ctx = ModuleContext::new(self.api, self.check_mode);
        info!(
            "Run {run_id}: reconciling {} resources{}",
            manifest.resources.len(),
            if self.check_mode { " (check mode)" } else { "" }
        );

        let mut results = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = 0;

        for (index, config) in manifest.resources.iter().enumerate() {
            match reconcile_resource(&ctx, config).await {
                Ok(result) => {
                    info!(
                        "{} '{}': {} ({} of {} steps changed)",
                        config.kind,
                        config.name,
                        status(result.changed),
                        result.changed_steps(),
                        result.steps.len()
                    );
                    results.push(result);
                }
                Err(err) => {
                    error!("{} '{}' failed: {err}", config.kind, config.name);
                    failures.push(ModuleFailure {
                        kind: config.kind,
                        name: config.name.clone(),
                        message: err.to_string(),
                    });
                    if !self.continue_on_error {
                        skipped = manifest.resources.len() - index - 1;
                        if skipped > 0 {
                            warn!("Skipping {skipped} remaining resources");
                        }
                        break;
                    }
                }
            }
        }

        ExecutionResult {
            run_id,
            started_at,
            finished_at: Utc::now(),
            check_mode: self.check_mode,
            success: failures.is_empty(),
            results,
            failures,
            skipped,
        }
    }
}

const fn status(changed: bool) -> &'static str {
    if changed { "changed" } else { "ok" }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Reconciled {} resources: {} changed, {} failed, {} skipped",
            self.results.len(),
            self.changed(),
            self.failures.len(),
            self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceConfig;
    use crate::engine::ORGANIZATIONS_PATH;
    use crate::testing::FakeIntersight;
    use serde_json::{json, Map, Value};

    fn entry(kind: ResourceKind, name: &str, params: Value) -> ResourceConfig {
        let params = match params {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ResourceConfig::new(kind, name).with_params(params)
    }

    fn manifest(resources: Vec<ResourceConfig>) -> Manifest {
        Manifest {
            resources,
            ..Manifest::default()
        }
    }

    #[tokio::test]
    async fn test_runs_entries_in_order() {
        let api = FakeIntersight::new();
        api.seed(ORGANIZATIONS_PATH, json!({"Name": "default"}));
        let manifest = manifest(vec![
            entry(ResourceKind::MacPool, "mp-1", json!({})),
            entry(ResourceKind::FcPool, "fp-1", json!({"pool_purpose": "WWPN"})),
        ]);

        let result = ManifestExecutor::new(&api).execute(&manifest).await;
        assert!(result.success);
        assert_eq!(result.results.len(), 2);
        assert_eq!(result.changed(), 2);
        assert_eq!(result.results[0].changed_steps(), 1);
        assert!(result.outcome().is_ok());
        assert_eq!(
            api.mutations(),
            vec![String::from("POST /macpool/Pools"), String::from("POST /fcpool/Pools")]
        );
        assert!(result.finished_at >= result.started_at);
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let api = FakeIntersight::new();
        api.seed(ORGANIZATIONS_PATH, json!({"Name": "default"}));
        let manifest = manifest(vec![
            entry(ResourceKind::DriveGroup, "dg-1", json!({"storage_policy": "missing"})),
            entry(ResourceKind::MacPool, "mp-1", json!({})),
            entry(ResourceKind::MacPool, "mp-2", json!({})),
        ]);

        let result = ManifestExecutor::new(&api).execute(&manifest).await;
        assert!(!result.success);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].name, "dg-1");
        assert_eq!(result.skipped, 2);
        assert!(result.results.is_empty());
        assert!(api.mutations().is_empty());

        let err = result.outcome().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Reconciliation error: Failed to reconcile drive_group 'dg-1': \
             Resolution error: Storage Policy 'missing' not found in /storage/StoragePolicies"
        );
    }

    #[tokio::test]
    async fn test_continue_on_error() {
        let api = FakeIntersight::new();
        api.seed(ORGANIZATIONS_PATH, json!({"Name": "default"}));
        let manifest = manifest(vec![
            entry(ResourceKind::MacPool, "mp-1", json!({"bogus": true})),
            entry(ResourceKind::MacPool, "mp-2", json!({})),
        ]);

        let result = ManifestExecutor::new(&api)
            .with_continue_on_error(true)
            .execute(&manifest)
            .await;
        assert!(!result.success);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.skipped, 0);
        assert_eq!(result.results.len(), 1);
        assert_eq!(api.mutations(), vec![String::from("POST /macpool/Pools")]);
        assert_eq!(
            result.to_string(),
            "Reconciled 1 resources: 1 changed, 1 failed, 0 skipped"
        );
    }

    #[tokio::test]
    async fn test_several_failures_abort() {
        let api = FakeIntersight::new();
        let manifest = manifest(vec![
            entry(ResourceKind::MacPool, "mp-1", json!({})),
            entry(ResourceKind::MacPool, "mp-2", json!({})),
        ]);

        let result = ManifestExecutor::new(&api)
            .with_continue_on_error(true)
            .execute(&manifest)
            .await;
        assert_eq!(result.failures.len(), 2);
        let err = result.outcome().unwrap_err();
        assert!(matches!(
            err,
            crate::error::IntersightError::Reconcile(ReconcileError::Aborted { .. })
        ));
    }

    #[tokio::test]
    async fn test_check_mode_reports_without_mutating() {
        let api = FakeIntersight::new();
        api.seed(ORGANIZATIONS_PATH, json!({"Name": "default"}));
        let manifest = manifest(vec![entry(ResourceKind::MacPool, "mp-1", json!({}))]);

        let result = ManifestExecutor::new(&api)
            .with_check_mode(true)
            .execute(&manifest)
            .await;
        assert!(result.check_mode);
        assert_eq!(result.changed(), 1);
        assert!(api.mutations().is_empty());
    }
}
