use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV_VAR: &str = "CHARTVULN_CONFIG";

/// Whether repeated image references are scanned once or every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScanPolicy {
    /// Scan each distinct image string once, at its first occurrence.
    #[default]
    Distinct,
    /// Scan once per reference found in the manifests.
    EveryOccurrence,
}

/// Runtime configuration for a chartvuln run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub helm_binary: String,
    pub trivy_binary: String,
    pub severities: Vec<String>,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub scan_policy: ScanPolicy,
    pub output_dir: PathBuf,
    /// Parent directory for rendered-manifest workspaces. System temp dir when unset.
    pub workspace_dir: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            helm_binary: "helm".to_string(),
            trivy_binary: "trivy".to_string(),
            severities: vec![
                "MEDIUM".to_string(),
                "HIGH".to_string(),
                "CRITICAL".to_string(),
            ],
            concurrency: 4,
            timeout_secs: 600,
            scan_policy: ScanPolicy::Distinct,
            output_dir: PathBuf::from("."),
            workspace_dir: None,
        }
    }
}

impl ScanConfig {
    pub fn from_toml_str(content: &str, source: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source_err| ConfigError::Parse {
            path: source.to_path_buf(),
            source: source_err,
        })
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load the file named by `CHARTVULN_CONFIG`, if set and non-empty.
    pub fn load_from_env() -> Result<Option<Self>, ConfigError> {
        let Some(path) = std::env::var(CONFIG_ENV_VAR).ok() else {
            return Ok(None);
        };

        if path.trim().is_empty() {
            return Ok(None);
        }

        Self::load_from_path(Path::new(&path)).map(Some)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.severities.is_empty() {
            return Err(ConfigError::Invalid(
                "severities must name at least one level".to_string(),
            ));
        }
        if self.severities.iter().any(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "severities must not contain blank entries".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
