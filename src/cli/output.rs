//! Output formatting for CLI commands.
//!
//! This module renders run reports, validation results and the kind
//! catalog as colored text tables or JSON.

use colored::Colorize;
use serde_json::json;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::engine::{ExecutionResult, ReconcileAction};
use crate::resources::{ResourceKind, Scope};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// One reconciled resource, for table display.
#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Moid")]
    moid: String,
}

/// One resource kind, for table display.
#[derive(Tabled)]
struct KindRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Path")]
    path: &'static str,
    #[tabled(rename = "Scope")]
    scope: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the report of a manifest run.
    #[must_use]
    pub fn format_execution(&self, result: &ExecutionResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => Self::format_execution_text(result),
        }
    }

    fn format_execution_text(result: &ExecutionResult) -> String {
        let mut output = String::new();
        let title = if result.check_mode { "Plan" } else { "Apply" };
        let _ = writeln!(output, "\n{title} {}", result.run_id.to_string().dimmed());

        let rows: Vec<StepRow> = result
            .results
            .iter()
            .flat_map(|module| {
                module.steps.iter().map(move |step| StepRow {
                    resource: format!("{} '{}'", module.kind, module.name),
                    action: Self::format_action(step.action),
                    path: step.resource_path.clone(),
                    moid: step.moid().unwrap_or("-").to_string(),
                })
            })
            .collect();

        if rows.is_empty() {
            output.push_str("   Nothing reconciled.\n");
        } else {
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        for failure in &result.failures {
            let _ = writeln!(
                output,
                "{} {} '{}': {}",
                "x".red(),
                failure.kind,
                failure.name,
                failure.message
            );
        }

        let elapsed = result.finished_at - result.started_at;
        let summary = format!(
            "{} changed, {} ok, {} failed, {} skipped",
            result.changed(),
            result.results.len() - result.changed(),
            result.failures.len(),
            result.skipped
        );
        let summary = if result.success {
            summary.green()
        } else {
            summary.red()
        };
        let _ = writeln!(
            output,
            "\n{summary} in {:.1}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        );
        output
    }

    fn format_action(action: ReconcileAction) -> String {
        match action {
            ReconcileAction::Create => action.as_str().green().to_string(),
            ReconcileAction::Update => action.as_str().yellow().to_string(),
            ReconcileAction::Delete => action.as_str().red().to_string(),
            ReconcileAction::NoOp => action.as_str().dimmed().to_string(),
        }
    }

    /// Formats an offline validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let errors: Vec<_> = result
                    .errors
                    .iter()
                    .map(|e| json!({"field": e.field, "message": e.message}))
                    .collect();
                let warnings = if show_warnings {
                    result.warnings.clone()
                } else {
                    Vec::new()
                };
                serde_json::to_string_pretty(&json!({
                    "valid": result.is_valid(),
                    "errors": errors,
                    "warnings": warnings,
                }))
                .unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = String::new();
                if result.is_valid() {
                    let _ = writeln!(output, "{} Manifest is valid", "ok".green());
                } else {
                    let _ = writeln!(output, "{} Manifest is invalid:", "error".red());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {}: {}", error.field, error.message);
                    }
                }
                if show_warnings && !result.warnings.is_empty() {
                    let _ = writeln!(output, "\n{}", "Warnings:".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats the catalog of supported kinds.
    #[must_use]
    pub fn format_kinds(&self) -> String {
        match self.format {
            OutputFormat::Json => {
                let kinds: Vec<_> = ResourceKind::ALL
                    .iter()
                    .map(|kind| {
                        json!({
                            "kind": kind.as_str(),
                            "path": kind.definition().resource_path,
                            "scope": Self::format_scope(kind.definition().scope),
                        })
                    })
                    .collect();
                serde_json::to_string_pretty(&kinds).unwrap_or_default()
            }
            OutputFormat::Text => {
                let rows: Vec<KindRow> = ResourceKind::ALL
                    .iter()
                    .map(|kind| KindRow {
                        kind: kind.as_str(),
                        path: kind.definition().resource_path,
                        scope: Self::format_scope(kind.definition().scope),
                    })
                    .collect();
                format!("{}\n", Table::new(rows))
            }
        }
    }

    fn format_scope(scope: Scope) -> String {
        match scope {
            Scope::Organization => String::from("organization"),
            Scope::Parent(key) => key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationError;

    #[test]
    fn test_kinds_json_lists_every_kind() {
        let output = OutputFormatter::new(OutputFormat::Json).format_kinds();
        let kinds: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(kinds.as_array().unwrap().len(), ResourceKind::ALL.len());
        assert_eq!(kinds[0]["kind"], "mac_pool");
        assert_eq!(kinds[0]["path"], "/macpool/Pools");
    }

    #[test]
    fn test_kinds_text_shows_parent_scope() {
        let output = OutputFormatter::new(OutputFormat::Text).format_kinds();
        assert!(output.contains("/storage/DriveGroups"));
        assert!(output.contains("storage_policy"));
    }

    #[test]
    fn test_validation_json() {
        let result = ValidationResult {
            errors: vec![ValidationError {
                field: String::from("resources[0].name"),
                message: String::from("Name cannot be empty"),
            }],
            warnings: vec![String::from("something odd")],
        };
        let output = OutputFormatter::new(OutputFormat::Json).format_validation(&result, false);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["valid"], false);
        assert_eq!(value["errors"][0]["field"], "resources[0].name");
        assert_eq!(value["warnings"], json!([]));
    }
}
