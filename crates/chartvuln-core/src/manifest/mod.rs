pub mod document;
pub mod images;

pub use document::{lookup, parse_documents, split_documents, ManifestDocument};
pub use images::{extract_images, ContainerField, Extraction, ImageReference, MalformedEntry};

use crate::error::ManifestError;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MANIFEST_SUFFIXES: &[&str] = &[".yaml", ".yml"];

/// Something the walker dropped instead of failing the run.
#[derive(Debug, Clone)]
pub struct Skipped {
    pub source_file: PathBuf,
    pub document_index: Option<usize>,
    pub reason: String,
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.document_index {
            Some(index) => write!(
                f,
                "{} (document {}): {}",
                self.source_file.display(),
                index,
                self.reason
            ),
            None => write!(f, "{}: {}", self.source_file.display(), self.reason),
        }
    }
}

/// Everything found while walking a rendered chart.
#[derive(Debug, Clone, Default)]
pub struct WalkOutcome {
    /// Image references in file, document, then container order. May repeat.
    pub images: Vec<ImageReference>,
    pub files: usize,
    pub documents: usize,
    pub skipped: Vec<Skipped>,
}

impl WalkOutcome {
    pub fn image_names(&self) -> Vec<&str> {
        self.images.iter().map(|r| r.image.as_str()).collect()
    }
}

pub fn is_manifest_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| MANIFEST_SUFFIXES.iter().any(|s| name.ends_with(s)))
}

/// Recursively list `.yaml`/`.yml` files under `root` in directory-tree order.
pub fn discover_manifest_files(root: &Path) -> Result<Vec<PathBuf>, ManifestError> {
    if !root.exists() {
        return Err(ManifestError::MissingRoot(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ManifestError::NotADirectory(root.to_path_buf()));
    }

    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(&root.to_string_lossy())
    );

    let files = glob::glob(&pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(error) => {
                warn!(%error, "skipping unreadable path");
                None
            }
        })
        .filter(|path| path.is_file() && is_manifest_file(path))
        .collect();

    Ok(files)
}

/// Walk a rendered chart and collect every container image reference.
///
/// Only setup problems with `root` are errors. Unreadable files, unparsable
/// documents and container entries without an image are logged, recorded in
/// [`WalkOutcome::skipped`], and the walk continues.
pub fn walk(root: &Path) -> Result<WalkOutcome, ManifestError> {
    let mut outcome = WalkOutcome::default();

    for file in discover_manifest_files(root)? {
        outcome.files += 1;
        walk_file(&file, &mut outcome);
    }

    debug!(
        files = outcome.files,
        documents = outcome.documents,
        images = outcome.images.len(),
        skipped = outcome.skipped.len(),
        "manifest walk finished"
    );
    Ok(outcome)
}

fn walk_file(path: &Path, outcome: &mut WalkOutcome) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) => {
            warn!(file = %path.display(), %error, "skipping unreadable manifest file");
            outcome.skipped.push(Skipped {
                source_file: path.to_path_buf(),
                document_index: None,
                reason: format!("failed to read file: {error}"),
            });
            return;
        }
    };

    let (documents, unparsed) = parse_documents(&content, path);
    debug!(file = %path.display(), documents = documents.len(), "parsed manifest file");

    for bad in unparsed {
        warn!(file = %path.display(), document = bad.index, error = %bad.error, "skipping unparsable document");
        outcome.skipped.push(Skipped {
            source_file: path.to_path_buf(),
            document_index: Some(bad.index),
            reason: format!("invalid YAML: {}", bad.error),
        });
    }

    for document in &documents {
        let extraction = extract_images(document);
        for entry in extraction.malformed {
            let reason = match entry.entry_index {
                Some(i) => format!("{}[{}]: {}", entry.field, i, entry.reason),
                None => entry.reason,
            };
            warn!(
                file = %path.display(),
                document = document.index,
                kind = document.kind().unwrap_or("unknown"),
                %reason,
                "skipping malformed container entry"
            );
            outcome.skipped.push(Skipped {
                source_file: path.to_path_buf(),
                document_index: Some(document.index),
                reason,
            });
        }
        outcome.images.extend(extraction.images);
    }
    outcome.documents += documents.len();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const DEPLOYMENT: &str = r#"---
# Source: web/templates/deployment.yaml
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  template:
    spec:
      containers:
        - name: web
          image: nginx:1.25
      initContainers:
        - name: init
          image: busybox:1.36
"#;

    #[test]
    fn test_walk_nonexistent_root() {
        let result = walk(Path::new("/nonexistent/rendered"));
        assert!(matches!(result, Err(ManifestError::MissingRoot(_))));
    }

    #[test]
    fn test_walk_file_root_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("deploy.yaml");
        fs::write(&file, DEPLOYMENT).unwrap();
        assert!(matches!(walk(&file), Err(ManifestError::NotADirectory(_))));
    }

    #[test]
    fn test_walk_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let outcome = walk(tmp.path()).unwrap();
        assert!(outcome.images.is_empty());
        assert_eq!(outcome.files, 0);
    }

    #[test]
    fn test_single_document_scenario() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("deployment.yaml"), DEPLOYMENT).unwrap();

        let outcome = walk(tmp.path()).unwrap();
        assert_eq!(outcome.image_names(), vec!["nginx:1.25", "busybox:1.36"]);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_only_manifest_suffixes_are_read() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("deployment.yml"), DEPLOYMENT).unwrap();
        fs::write(tmp.path().join("deployment.yaml.bak"), DEPLOYMENT).unwrap();
        fs::write(tmp.path().join("NOTES.txt"), DEPLOYMENT).unwrap();

        let outcome = walk(tmp.path()).unwrap();
        assert_eq!(outcome.files, 1);
        assert_eq!(outcome.images.len(), 2);
    }

    #[test]
    fn test_nested_directories_are_walked() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("web/charts/redis/templates");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            nested.join("statefulset.yaml"),
            "kind: StatefulSet\nspec:\n  template:\n    spec:\n      containers:\n        - image: redis:7\n",
        )
        .unwrap();

        let outcome = walk(tmp.path()).unwrap();
        assert_eq!(outcome.image_names(), vec!["redis:7"]);
        assert!(outcome.images[0].source_file.ends_with("statefulset.yaml"));
    }

    #[test]
    fn test_bad_documents_are_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("mixed.yaml"),
            "kind: [broken\n---\nspec:\n  template:\n    spec:\n      containers:\n        - name: missing\n        - image: ok:1\n",
        )
        .unwrap();
        fs::write(tmp.path().join("binary.yaml"), b"\xff\xfe\x00\x01").unwrap();

        let outcome = walk(tmp.path()).unwrap();
        assert_eq!(outcome.image_names(), vec!["ok:1"]);
        assert_eq!(outcome.skipped.len(), 3);
    }

    #[test]
    fn test_walk_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        for dir in ["a", "b/c", "d"] {
            fs::create_dir_all(tmp.path().join(dir)).unwrap();
            fs::write(tmp.path().join(dir).join("deploy.yaml"), DEPLOYMENT).unwrap();
        }

        let first = walk(tmp.path()).unwrap();
        let second = walk(tmp.path()).unwrap();
        assert_eq!(first.images, second.images);
        assert_eq!(first.images.len(), 6);
    }

    #[test]
    fn test_root_with_glob_metacharacters() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("chart[1]");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("deploy.yaml"), DEPLOYMENT).unwrap();

        let outcome = walk(&root).unwrap();
        assert_eq!(outcome.images.len(), 2);
    }
}
