mod display;

use anyhow::{Context, Result};
use chartvuln_core::config::{ScanConfig, ScanPolicy};
use chartvuln_core::pipeline::{self, PipelineOutcome};
use chartvuln_core::report::default_report_path;
use chartvuln_core::{ChartSource, HelmRenderer, TrivyScanner};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "chartvuln",
    about = "chartvuln — Vulnerability Reporting Tool for Helm Charts",
    long_about = "Render a Helm chart, find every container image it references, scan each image with Trivy, and write the findings to a CSV report.",
    disable_version_flag = true
)]
struct Cli {
    /// Path to a local Helm chart package (.tgz) or chart directory, or a chart name (e.g. repo/chart)
    chart: String,

    /// Chart version (required for repository charts)
    #[arg(long, visible_alias = "chart-version")]
    version: Option<String>,

    /// Report file path (defaults to <output-dir>/<YYYY-MM-DD>_vulnerabilities.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory for the date-stamped report
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Maximum number of concurrent image scans
    #[arg(short = 'j', long)]
    concurrency: Option<usize>,

    /// Per-image scan timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Scan an image once per reference instead of once per distinct image
    #[arg(long)]
    scan_every_occurrence: bool,

    /// TOML config file (overrides CHARTVULN_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = resolve_config(&cli)?;
    let source = ChartSource::parse(&cli.chart, cli.version.as_deref())?;
    display::print_source(&source);
    info!(
        chart = %source,
        concurrency = config.concurrency,
        timeout_secs = config.timeout_secs,
        "starting run"
    );

    let report_path = cli.output.clone().unwrap_or_else(|| {
        default_report_path(&config.output_dir, chrono::Local::now().date_naive())
    });

    let renderer = HelmRenderer::new(config.helm_binary.clone());
    let scanner = Arc::new(TrivyScanner::new(
        config.trivy_binary.clone(),
        config.severities.clone(),
    ));

    // Dropping the pipeline future removes the workspace and kills running scans.
    let outcome = tokio::select! {
        result = pipeline::run(&source, &config, &report_path, &renderer, scanner) => {
            result.with_context(|| format!("Failed to scan chart '{}'", cli.chart))?
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; removing workspace and stopping running scans");
            anyhow::bail!("Interrupted");
        }
    };

    match outcome {
        PipelineOutcome::NoImages { skipped } => display::print_no_images(&skipped),
        PipelineOutcome::Report(report) => display::print_run_report(&report),
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<ScanConfig> {
    let config = match &cli.config {
        Some(path) => ScanConfig::load_from_path(path)?,
        None => ScanConfig::load_from_env()?.unwrap_or_default(),
    };
    apply_overrides(cli, config)
}

/// Layer command-line flags over a loaded config and validate the result.
fn apply_overrides(cli: &Cli, mut config: ScanConfig) -> Result<ScanConfig> {
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if cli.scan_every_occurrence {
        config.scan_policy = ScanPolicy::EveryOccurrence;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
