//! Intersight reconcile CLI entrypoint.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use intersight_reconcile::cli::{Cli, Commands, OutputFormatter};
use intersight_reconcile::config::{find_config_file, ConfigParser, ConfigValidator, Manifest};
use intersight_reconcile::engine::ManifestExecutor;
use intersight_reconcile::error::{IntersightError, Result};
use intersight_reconcile::intersight::IntersightClient;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings, &formatter),
        Commands::Plan => cmd_plan(cli.config.as_ref(), &formatter).await,
        Commands::Apply { yes, continue_on_error } => {
            cmd_apply(cli.config.as_ref(), yes, continue_on_error, &formatter).await
        }
        Commands::Kinds => {
            emit(&formatter.format_kinds());
            Ok(())
        }
    }
}

/// Offline validation.
fn cmd_validate(
    config_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating manifest: {}", config_file.display());

    let manifest = load_manifest(&config_file)?;
    let result = ConfigValidator::new().check(&manifest);
    emit(&formatter.format_validation(&result, show_warnings));

    if result.is_valid() {
        Ok(())
    } else {
        Err(IntersightError::internal(format!(
            "{} validation errors",
            result.errors.len()
        )))
    }
}

/// Reconcile in check mode.
async fn cmd_plan(config_path: Option<&PathBuf>, formatter: &OutputFormatter) -> Result<()> {
    let manifest = load_validated(config_path)?;
    let client = create_client(&manifest)?;

    let result = ManifestExecutor::new(&client)
        .with_check_mode(true)
        .execute(&manifest)
        .await;
    emit(&formatter.format_execution(&result));
    result.outcome()
}

/// Reconcile for real.
async fn cmd_apply(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    continue_on_error: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let manifest = load_validated(config_path)?;
    let client = create_client(&manifest)?;

    if !auto_approve {
        eprint!(
            "Reconcile {} resources against {}? [y/N]: ",
            manifest.resources.len(),
            client.base_url()
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Apply cancelled.");
            return Ok(());
        }
    }

    let result = ManifestExecutor::new(&client)
        .with_continue_on_error(continue_on_error)
        .execute(&manifest)
        .await;
    emit(&formatter.format_execution(&result));
    result.outcome()
}

// ============================================================================
// Helper Functions
// ============================================================================

fn emit(text: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = writeln!(stdout, "{}", text.trim_end());
}

/// Resolves the manifest path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

fn load_manifest(config_file: &Path) -> Result<Manifest> {
    let parser =
        ConfigParser::new().with_base_path(config_file.parent().unwrap_or_else(|| Path::new(".")));
    parser.load_dotenv()?;
    parser.load_with_env(config_file)
}

/// Loads the manifest and fails on any validation error.
fn load_validated(config_path: Option<&PathBuf>) -> Result<Manifest> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading manifest from: {}", config_file.display());

    let manifest = load_manifest(&config_file)?;
    let result = ConfigValidator::new().validate(&manifest)?;
    for warning in &result.warnings {
        tracing::warn!("{warning}");
    }
    Ok(manifest)
}

fn create_client(manifest: &Manifest) -> Result<IntersightClient> {
    let token = ConfigParser::api_token()?;
    IntersightClient::from_config(&manifest.intersight, &token)
}
