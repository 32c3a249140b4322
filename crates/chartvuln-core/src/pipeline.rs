use crate::chart::ChartSource;
use crate::config::ScanConfig;
use crate::error::PipelineError;
use crate::manifest::{self, ImageReference, Skipped};
use crate::orchestrator::{self, ScanFailure, ScanOptions};
use crate::renderer::ChartRenderer;
use crate::report::{self, ReportRow, ReportSummary};
use crate::scanner::ImageScanner;
use crate::workspace::Workspace;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a completed run.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The rendered chart references no container images. Nothing was scanned
    /// and no report was written.
    NoImages { skipped: Vec<Skipped> },
    Report(RunReport),
}

#[derive(Debug)]
pub struct RunReport {
    pub path: PathBuf,
    pub images: Vec<ImageReference>,
    pub scanned: usize,
    pub rows: Vec<ReportRow>,
    pub summary: ReportSummary,
    pub failures: Vec<ScanFailure>,
    pub skipped: Vec<Skipped>,
}

/// Render `source` into a fresh workspace, then scan and report on it.
///
/// The workspace is removed on every exit path, including when this future is
/// dropped before completion.
pub async fn run<R, S>(
    source: &ChartSource,
    config: &ScanConfig,
    report_path: &Path,
    renderer: &R,
    scanner: Arc<S>,
) -> Result<PipelineOutcome, PipelineError>
where
    R: ChartRenderer,
    S: ImageScanner + 'static,
{
    let workspace = Workspace::acquire(config.workspace_dir.as_deref(), &source.workspace_label())
        .map_err(PipelineError::Workspace)?;

    info!(chart = %source, "rendering Helm chart");
    renderer.render(source, workspace.path()).await?;
    info!(path = %workspace.path().display(), "rendered chart");

    let outcome = analyze_manifests(
        workspace.path(),
        scanner,
        ScanOptions::from(config),
        report_path,
    )
    .await?;

    if let Err(error) = workspace.close() {
        warn!(%error, "failed to remove workspace");
    }
    Ok(outcome)
}

/// Walk an already rendered manifest tree, scan its images and write the report.
pub async fn analyze_manifests<S>(
    root: &Path,
    scanner: Arc<S>,
    options: ScanOptions,
    report_path: &Path,
) -> Result<PipelineOutcome, PipelineError>
where
    S: ImageScanner + 'static,
{
    let walk = manifest::walk(root)?;
    info!(
        images = walk.images.len(),
        files = walk.files,
        documents = walk.documents,
        "images found"
    );

    if walk.images.is_empty() {
        info!("no images found in the Helm chart");
        return Ok(PipelineOutcome::NoImages {
            skipped: walk.skipped,
        });
    }

    let batch = orchestrator::scan_images(scanner, &walk.images, options).await;
    let scanned = batch.scans.len();
    let rows = report::aggregate(&batch.scans);

    report::write_report(&rows, report_path)?;
    info!(path = %report_path.display(), rows = rows.len(), "results saved");

    Ok(PipelineOutcome::Report(RunReport {
        path: report_path.to_path_buf(),
        images: walk.images,
        scanned,
        summary: ReportSummary::from_rows(&rows),
        rows,
        failures: batch.failures,
        skipped: walk.skipped,
    }))
}
