use crate::error::ReportError;
use crate::scanner::{ImageScan, Severity};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const REPORT_HEADER: [&str; 4] = ["image:tag", "component/library", "vulnerability", "severity"];

/// One finding flattened into a table row. Missing values are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub target: String,
    pub component: String,
    pub vulnerability: String,
    pub severity: String,
}

impl ReportRow {
    fn record(&self) -> [&str; 4] {
        [
            self.target.as_str(),
            self.component.as_str(),
            self.vulnerability.as_str(),
            self.severity.as_str(),
        ]
    }
}

/// Flatten scans into rows: image order, then result order, then finding order.
/// Nothing is deduplicated, sorted or filtered.
pub fn aggregate(scans: &[ImageScan]) -> Vec<ReportRow> {
    scans
        .iter()
        .flat_map(|scan| &scan.results)
        .flat_map(|result| {
            result.findings.iter().map(move |finding| ReportRow {
                target: result.target.clone(),
                component: finding.package.clone().unwrap_or_default(),
                vulnerability: finding.vulnerability_id.clone().unwrap_or_default(),
                severity: finding
                    .severity
                    .map(|s| s.label().to_string())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Write the header and one CSV record per row.
pub fn write_csv<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), ReportError> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(REPORT_HEADER)?;
    for row in rows {
        wtr.write_record(row.record())?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn render_csv(rows: &[ReportRow]) -> Result<String, ReportError> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write the report to `path`, creating parent directories as needed.
pub fn write_report(rows: &[ReportRow], path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_csv(rows, std::io::BufWriter::new(file))
}

/// `<YYYY-MM-DD>_vulnerabilities.csv`
pub fn report_file_name(date: NaiveDate) -> String {
    format!("{}_vulnerabilities.csv", date.format("%Y-%m-%d"))
}

pub fn default_report_path(output_dir: &Path, date: NaiveDate) -> PathBuf {
    output_dir.join(report_file_name(date))
}

/// Counts shown after a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub total: usize,
    pub targets: usize,
    /// Keyed by severity label; findings without a severity count under "".
    pub by_severity: BTreeMap<String, usize>,
}

impl ReportSummary {
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        let mut by_severity = BTreeMap::new();
        for row in rows {
            *by_severity.entry(row.severity.clone()).or_insert(0) += 1;
        }
        let targets = rows
            .iter()
            .map(|r| r.target.as_str())
            .collect::<HashSet<_>>()
            .len();

        Self {
            total: rows.len(),
            targets,
            by_severity,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(severity.label()).copied().unwrap_or(0)
    }
}
