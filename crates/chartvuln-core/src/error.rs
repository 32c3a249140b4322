use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Failure of the external chart renderer. Always fatal to the run.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to spawn renderer '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("renderer exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}

/// Failure to scan a single image. Recoverable: the batch skips the image.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to spawn scanner '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scanner exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("scan timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("scanner returned unparsable output: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    #[error("scan task aborted: {0}")]
    Aborted(String),
}

/// Problems setting up a manifest walk. Per-document problems are not errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest root '{}' does not exist", .0.display())]
    MissingRoot(PathBuf),

    #[error("manifest root '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("invalid manifest glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Fatal pipeline errors. Anything here aborts the run with a non-zero exit.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("chart version is required for repository chart '{0}'")]
    MissingVersion(String),

    #[error("chart file '{}' does not exist", .0.display())]
    ChartNotFound(PathBuf),

    #[error("failed to create workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("failed to render chart: {0}")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to write report: {0}")]
    Report(#[from] ReportError),
}
