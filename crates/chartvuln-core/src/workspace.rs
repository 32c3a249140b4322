use std::path::Path;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Scoped directory that receives rendered manifests.
///
/// The directory is removed when the `Workspace` is dropped, so every exit path of
/// the pipeline (success, error, or the future being dropped on interrupt) releases it.
/// Call [`Workspace::close`] to observe removal errors on the happy path.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
}

impl Workspace {
    /// Create `helm_chart_<label>_<random>` under `parent`, or the system temp dir.
    ///
    /// The random suffix keeps concurrent runs for the same chart apart.
    pub fn acquire(parent: Option<&Path>, label: &str) -> std::io::Result<Self> {
        let prefix = format!("helm_chart_{label}_");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);

        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        debug!(path = %dir.path().display(), "acquired workspace");
        Ok(Self { dir: Some(dir) })
    }

    pub fn path(&self) -> &Path {
        match &self.dir {
            Some(dir) => dir.path(),
            None => Path::new(""),
        }
    }

    /// Remove the workspace now and report failure to do so.
    pub fn close(mut self) -> std::io::Result<()> {
        match self.dir.take() {
            Some(dir) => {
                let path = dir.path().to_path_buf();
                dir.close()?;
                debug!(path = %path.display(), "released workspace");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(error) = dir.close() {
                warn!(path = %path.display(), %error, "failed to remove workspace");
            } else {
                debug!(path = %path.display(), "released workspace on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_creates_prefixed_dir() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = Workspace::acquire(Some(parent.path()), "nginx").unwrap();

        assert!(workspace.path().is_dir());
        assert!(workspace.path().starts_with(parent.path()));
        let name = workspace.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("helm_chart_nginx_"));
    }

    #[test]
    fn test_same_label_does_not_collide() {
        let parent = tempfile::tempdir().unwrap();
        let first = Workspace::acquire(Some(parent.path()), "nginx").unwrap();
        let second = Workspace::acquire(Some(parent.path()), "nginx").unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_close_removes_tree() {
        let parent = tempfile::tempdir().unwrap();
        let workspace = Workspace::acquire(Some(parent.path()), "app").unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::create_dir_all(path.join("app/templates")).unwrap();
        std::fs::write(path.join("app/templates/deploy.yaml"), "kind: Deployment").unwrap();

        workspace.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_tree_on_early_exit() {
        let parent = tempfile::tempdir().unwrap();
        let path = {
            let workspace = Workspace::acquire(Some(parent.path()), "app").unwrap();
            std::fs::write(workspace.path().join("svc.yaml"), "kind: Service").unwrap();
            workspace.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_acquire_creates_missing_parent() {
        let root = tempfile::tempdir().unwrap();
        let parent = root.path().join("nested/work");
        let workspace = Workspace::acquire(Some(&parent), "app").unwrap();
        assert!(workspace.path().starts_with(&parent));
    }
}
