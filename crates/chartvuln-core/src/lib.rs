pub mod chart;
pub mod config;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod pipeline;
pub mod renderer;
pub mod report;
pub mod scanner;
pub mod workspace;

pub use chart::ChartSource;
pub use config::{ScanConfig, ScanPolicy};
pub use error::{PipelineError, RenderError, ScanError};
pub use manifest::{ImageReference, ManifestDocument, WalkOutcome};
pub use orchestrator::{ScanBatch, ScanFailure, ScanOptions};
pub use pipeline::{PipelineOutcome, RunReport};
pub use renderer::{ChartRenderer, HelmRenderer};
pub use report::{ReportRow, ReportSummary};
pub use scanner::{ImageScan, ImageScanner, ScanResult, Severity, TrivyScanner, VulnerabilityFinding};
pub use workspace::Workspace;
