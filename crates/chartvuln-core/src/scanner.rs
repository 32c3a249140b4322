use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Scanner severity level. Unrecognised levels map to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
    Unknown,
}

impl Severity {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "LOW" => Severity::Low,
            "MEDIUM" => Severity::Medium,
            "HIGH" => Severity::High,
            "CRITICAL" => Severity::Critical,
            _ => Severity::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One vulnerability affecting one package of a scanned image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VulnerabilityFinding {
    pub package: Option<String>,
    pub vulnerability_id: Option<String>,
    pub severity: Option<Severity>,
}

/// Findings for one scanner target, e.g. the OS layer or a language lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub target: String,
    pub findings: Vec<VulnerabilityFinding>,
}

/// Everything the scanner reported for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageScan {
    pub image: String,
    pub results: Vec<ScanResult>,
}

impl ImageScan {
    pub fn finding_count(&self) -> usize {
        self.results.iter().map(|r| r.findings.len()).sum()
    }
}

/// A vulnerability scanner that can be invoked once per image.
pub trait ImageScanner: Send + Sync {
    fn scan(
        &self,
        image: &str,
    ) -> impl Future<Output = Result<Vec<ScanResult>, ScanError>> + Send;
}

#[derive(Debug, Deserialize)]
struct TrivyReport {
    #[serde(rename = "Results", default)]
    results: Option<Vec<TrivyResult>>,
}

#[derive(Debug, Deserialize)]
struct TrivyResult {
    #[serde(rename = "Target", default)]
    target: Option<String>,
    #[serde(rename = "Vulnerabilities", default)]
    vulnerabilities: Option<Vec<TrivyVulnerability>>,
}

#[derive(Debug, Deserialize)]
struct TrivyVulnerability {
    #[serde(rename = "PkgName", default)]
    pkg_name: Option<String>,
    #[serde(rename = "VulnerabilityID", default)]
    vulnerability_id: Option<String>,
    #[serde(rename = "Severity", default)]
    severity: Option<String>,
}

/// Parse `trivy image --format=json` output.
///
/// Missing `Results`, `null` vulnerability lists and missing finding fields are
/// all tolerated; only invalid JSON is an error.
pub fn parse_trivy_report(json: &str) -> Result<Vec<ScanResult>, ScanError> {
    let report: TrivyReport = serde_json::from_str(json)?;

    Ok(report
        .results
        .unwrap_or_default()
        .into_iter()
        .map(|result| ScanResult {
            target: result.target.unwrap_or_default(),
            findings: result
                .vulnerabilities
                .unwrap_or_default()
                .into_iter()
                .map(|v| VulnerabilityFinding {
                    package: v.pkg_name,
                    vulnerability_id: v.vulnerability_id,
                    severity: v
                        .severity
                        .as_deref()
                        .filter(|s| !s.trim().is_empty())
                        .map(Severity::parse),
                })
                .collect(),
        })
        .collect())
}

/// Runs the `trivy` CLI for each image.
#[derive(Debug, Clone)]
pub struct TrivyScanner {
    pub binary: String,
    pub severities: Vec<String>,
}

impl TrivyScanner {
    pub fn new(binary: impl Into<String>, severities: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            severities,
        }
    }

    pub fn args(&self, image: &str) -> Vec<String> {
        vec![
            "image".to_string(),
            format!("--severity={}", self.severities.join(",")),
            "--format=json".to_string(),
            image.to_string(),
        ]
    }
}

impl ImageScanner for TrivyScanner {
    async fn scan(&self, image: &str) -> Result<Vec<ScanResult>, ScanError> {
        debug!(binary = %self.binary, %image, "invoking scanner");

        // Dropping the future (timeout, abort, interrupt) must also stop the process.
        let output = Command::new(&self.binary)
            .args(self.args(image))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ScanError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ScanError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_trivy_report(&String::from_utf8_lossy(&output.stdout))
    }
}
