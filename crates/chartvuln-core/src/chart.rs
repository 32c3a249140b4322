use crate::error::PipelineError;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Where a chart comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartSource {
    /// A packaged chart (`.tgz`) or an unpacked chart directory on disk.
    LocalArchive(PathBuf),
    /// A chart in a configured repository, e.g. `bitnami/nginx`.
    Repository { name: String, version: String },
}

const ARCHIVE_SUFFIXES: &[&str] = &[".tgz", ".tar.gz"];

impl ChartSource {
    /// Classify the CLI chart argument.
    ///
    /// Archive-looking arguments and existing paths are local charts and must exist.
    /// Anything else is a repository chart and needs an explicit version.
    pub fn parse(chart: &str, version: Option<&str>) -> Result<Self, PipelineError> {
        let path = Path::new(chart);
        let looks_like_archive = ARCHIVE_SUFFIXES.iter().any(|s| chart.ends_with(s));

        if looks_like_archive || path.exists() {
            if !path.exists() {
                return Err(PipelineError::ChartNotFound(path.to_path_buf()));
            }
            return Ok(ChartSource::LocalArchive(path.to_path_buf()));
        }

        match version.map(str::trim).filter(|v| !v.is_empty()) {
            Some(version) => Ok(ChartSource::Repository {
                name: chart.to_string(),
                version: version.to_string(),
            }),
            None => Err(PipelineError::MissingVersion(chart.to_string())),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ChartSource::LocalArchive(_))
    }

    /// Filesystem-safe label derived from the chart identity, used to name workspaces.
    pub fn workspace_label(&self) -> String {
        let raw = match self {
            ChartSource::LocalArchive(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.split('.').next())
                .unwrap_or("chart")
                .to_string(),
            ChartSource::Repository { name, .. } => name.replace('/', "_"),
        };

        let sanitized = unsafe_chars().replace_all(&raw, "_").into_owned();
        if sanitized.is_empty() {
            "chart".to_string()
        } else {
            sanitized
        }
    }
}

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]").expect("static regex"))
}

impl fmt::Display for ChartSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartSource::LocalArchive(path) => write!(f, "{}", path.display()),
            ChartSource::Repository { name, version } => write!(f, "{name} (version: {version})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_chart_requires_version() {
        let err = ChartSource::parse("bitnami/nginx", None).unwrap_err();
        assert!(matches!(err, PipelineError::MissingVersion(ref name) if name == "bitnami/nginx"));

        let err = ChartSource::parse("bitnami/nginx", Some("  ")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingVersion(_)));
    }

    #[test]
    fn test_repository_chart_with_version() {
        let source = ChartSource::parse("bitnami/nginx", Some("15.4.2")).unwrap();
        assert_eq!(
            source,
            ChartSource::Repository {
                name: "bitnami/nginx".to_string(),
                version: "15.4.2".to_string(),
            }
        );
        assert!(!source.is_local());
        assert_eq!(source.workspace_label(), "bitnami_nginx");
    }

    #[test]
    fn test_missing_archive_is_not_found() {
        let err = ChartSource::parse("/nonexistent/mychart-1.2.3.tgz", None).unwrap_err();
        assert!(matches!(err, PipelineError::ChartNotFound(_)));
    }

    #[test]
    fn test_local_archive_label() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("mychart-1.2.3.tgz");
        std::fs::write(&archive, b"not really gzip").unwrap();

        let source = ChartSource::parse(archive.to_str().unwrap(), None).unwrap();
        assert!(source.is_local());
        assert_eq!(source.workspace_label(), "mychart-1");
    }

    #[test]
    fn test_local_chart_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let source = ChartSource::parse(tmp.path().to_str().unwrap(), None).unwrap();
        assert_eq!(source, ChartSource::LocalArchive(tmp.path().to_path_buf()));
    }

    #[test]
    fn test_label_strips_unsafe_characters() {
        let source = ChartSource::Repository {
            name: "oci://registry.example.com/charts/app".to_string(),
            version: "1.0.0".to_string(),
        };
        assert_eq!(
            source.workspace_label(),
            "oci___registry_example_com_charts_app"
        );
    }
}
