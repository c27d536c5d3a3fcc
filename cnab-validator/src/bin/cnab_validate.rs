//! CNAB400 validator command-line binary

use anyhow::Context;
use clap::{Parser, ValueEnum};
use cnab_validator::{validate_file, Severity, ValidationConfig};
use std::path::PathBuf;
use std::process::ExitCode;

/// Validate a Bradesco CNAB400 remittance file.
///
/// Exits with 0 when no error passes the severity filter, 1 when some do and
/// 2 when the configuration or the input cannot be used.
#[derive(Parser, Debug)]
#[command(name = "cnab-validate", version, about)]
struct Cli {
    /// Remittance file to validate
    file: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Century added to 2-digit years (e.g. 1900 or 2000)
    #[arg(long)]
    century_base: Option<i32>,

    /// Tolerance for trailer totals, in cents
    #[arg(long)]
    tolerance_cents: Option<u64>,

    /// Show errors at or above this severity (fatal, business, field)
    #[arg(long)]
    min_severity: Option<Severity>,

    /// Validate the Nosso Número check digit
    #[arg(long)]
    validate_nosso_numero: bool,

    /// TOML configuration file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn resolve_config(cli: &Cli) -> anyhow::Result<ValidationConfig> {
    let mut config = match &cli.config {
        Some(path) => ValidationConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ValidationConfig::default(),
    };
    if let Some(base) = cli.century_base {
        config.century_base = base;
    }
    if let Some(cents) = cli.tolerance_cents {
        config.tolerance_cents = cents;
    }
    if let Some(severity) = cli.min_severity {
        config.min_severity = severity;
    }
    if cli.validate_nosso_numero {
        config.validate_check_digit = true;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli, config: &ValidationConfig) -> anyhow::Result<bool> {
    let report = validate_file(&cli.file, config)
        .with_context(|| format!("validating {}", cli.file.display()))?;

    match cli.format {
        Format::Json => println!("{}", report.to_json(config.min_severity)?),
        Format::Text => print!("{}", report.render_text(config.min_severity)),
    }
    Ok(report.is_valid_at(config.min_severity))
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            return ExitCode::from(2);
        }
    };
    tracing::debug!(?config, "Resolved configuration");

    match run(&cli, &config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}
