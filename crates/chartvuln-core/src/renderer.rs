use crate::chart::ChartSource;
use crate::error::RenderError;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Renders a chart into a directory of plain manifest files.
pub trait ChartRenderer: Send + Sync {
    fn render(
        &self,
        source: &ChartSource,
        out_dir: &Path,
    ) -> impl Future<Output = Result<(), RenderError>> + Send;
}

/// Runs `helm template`.
#[derive(Debug, Clone)]
pub struct HelmRenderer {
    pub binary: String,
}

impl HelmRenderer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn args(source: &ChartSource, out_dir: &Path) -> Vec<String> {
        let mut args = vec!["template".to_string()];
        match source {
            ChartSource::LocalArchive(path) => {
                args.push(path.to_string_lossy().into_owned());
            }
            ChartSource::Repository { name, version } => {
                args.push(name.clone());
                args.push("--version".to_string());
                args.push(version.clone());
            }
        }
        args.push("--output-dir".to_string());
        args.push(out_dir.to_string_lossy().into_owned());
        args
    }
}

impl ChartRenderer for HelmRenderer {
    async fn render(&self, source: &ChartSource, out_dir: &Path) -> Result<(), RenderError> {
        let args = Self::args(source, out_dir);
        debug!(binary = %self.binary, ?args, "invoking renderer");

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RenderError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(target: "chartvuln::helm", "{line}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_args_for_local_archive() {
        let source = ChartSource::LocalArchive(PathBuf::from("charts/web-1.0.0.tgz"));
        assert_eq!(
            HelmRenderer::args(&source, Path::new("/tmp/out")),
            vec!["template", "charts/web-1.0.0.tgz", "--output-dir", "/tmp/out"]
        );
    }

    #[test]
    fn test_args_for_repository_chart() {
        let source = ChartSource::Repository {
            name: "bitnami/nginx".to_string(),
            version: "15.4.2".to_string(),
        };
        assert_eq!(
            HelmRenderer::args(&source, Path::new("/tmp/out")),
            vec![
                "template",
                "bitnami/nginx",
                "--version",
                "15.4.2",
                "--output-dir",
                "/tmp/out"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let renderer = HelmRenderer::new("/this/does/not/exist");
        let source = ChartSource::LocalArchive(PathBuf::from("chart.tgz"));
        let err = renderer
            .render(&source, Path::new("/tmp"))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let renderer = HelmRenderer::new("false");
        let source = ChartSource::LocalArchive(PathBuf::from("chart.tgz"));
        let err = renderer
            .render(&source, Path::new("/tmp"))
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Failed { .. }));
    }
}
