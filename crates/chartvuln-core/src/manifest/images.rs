use super::document::{lookup, untagged, ManifestDocument};
use serde::Serialize;
use serde_yaml::Value;
use std::fmt;
use std::path::PathBuf;

/// Pod spec locations for workload kinds that wrap a pod template.
const POD_TEMPLATE_PATHS: &[&[&str]] = &[
    // Deployment, StatefulSet, DaemonSet, ReplicaSet, Job, ReplicationController
    &["spec", "template", "spec"],
    // CronJob
    &["spec", "jobTemplate", "spec", "template", "spec"],
];

/// Container list a reference was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContainerField {
    Containers,
    InitContainers,
}

impl ContainerField {
    pub const ALL: [ContainerField; 2] = [ContainerField::Containers, ContainerField::InitContainers];

    pub fn key(&self) -> &'static str {
        match self {
            ContainerField::Containers => "containers",
            ContainerField::InitContainers => "initContainers",
        }
    }
}

impl fmt::Display for ContainerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A container image exactly as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    pub image: String,
    pub source_file: PathBuf,
    pub document_index: usize,
    pub field: ContainerField,
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.image)
    }
}

/// A container entry that was skipped because it had no usable `image`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEntry {
    pub field: ContainerField,
    /// Entry position within the list, or `None` when the list itself is malformed.
    pub entry_index: Option<usize>,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub images: Vec<ImageReference>,
    pub malformed: Vec<MalformedEntry>,
}

/// Collect image references from one document.
///
/// Non-mapping documents and documents without a pod spec yield nothing. For each
/// pod spec, `containers` come before `initContainers`, each in document order.
pub fn extract_images(document: &ManifestDocument) -> Extraction {
    let mut extraction = Extraction::default();

    if !untagged(&document.value).is_mapping() {
        return extraction;
    }

    for pod_spec in pod_specs(document) {
        for field in ContainerField::ALL {
            collect_field(document, pod_spec, field, &mut extraction);
        }
    }

    extraction
}

fn pod_specs(document: &ManifestDocument) -> Vec<&Value> {
    let mut specs: Vec<&Value> = POD_TEMPLATE_PATHS
        .iter()
        .filter_map(|path| lookup(&document.value, path))
        .filter(|spec| spec.is_mapping())
        .collect();

    if document.kind() == Some("Pod") {
        if let Some(spec) = lookup(&document.value, &["spec"]).filter(|s| s.is_mapping()) {
            specs.push(spec);
        }
    }

    specs
}

fn collect_field(
    document: &ManifestDocument,
    pod_spec: &Value,
    field: ContainerField,
    extraction: &mut Extraction,
) {
    let entries = match lookup(pod_spec, &[field.key()]) {
        None | Some(Value::Null) => return,
        Some(Value::Sequence(entries)) => entries,
        Some(_) => {
            extraction.malformed.push(MalformedEntry {
                field,
                entry_index: None,
                reason: format!("`{}` is not a list", field.key()),
            });
            return;
        }
    };

    for (entry_index, entry) in entries.iter().enumerate() {
        let entry = untagged(entry);
        if !entry.is_mapping() {
            extraction.malformed.push(MalformedEntry {
                field,
                entry_index: Some(entry_index),
                reason: "container entry is not a mapping".to_string(),
            });
            continue;
        }

        match lookup(entry, &["image"]) {
            Some(Value::String(image)) => extraction.images.push(ImageReference {
                image: image.clone(),
                source_file: document.source_file.clone(),
                document_index: document.index,
                field,
            }),
            Some(_) => extraction.malformed.push(MalformedEntry {
                field,
                entry_index: Some(entry_index),
                reason: "`image` is not a string".to_string(),
            }),
            None => extraction.malformed.push(MalformedEntry {
                field,
                entry_index: Some(entry_index),
                reason: "container entry has no `image`".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::document::parse_documents;
    use std::path::Path;

    fn extract(yaml: &str) -> Extraction {
        let (documents, unparsed) = parse_documents(yaml, Path::new("test.yaml"));
        assert!(unparsed.is_empty(), "fixture should parse: {unparsed:?}");
        assert_eq!(documents.len(), 1);
        extract_images(&documents[0])
    }

    fn images(extraction: &Extraction) -> Vec<&str> {
        extraction.images.iter().map(|r| r.image.as_str()).collect()
    }

    #[test]
    fn test_containers_then_init_containers() {
        let extraction = extract(
            r#"
spec:
  template:
    spec:
      initContainers:
        - name: init
          image: busybox:1.36
      containers:
        - name: web
          image: nginx:1.25
"#,
        );
        assert_eq!(images(&extraction), vec!["nginx:1.25", "busybox:1.36"]);
        assert_eq!(extraction.images[0].field, ContainerField::Containers);
        assert_eq!(extraction.images[1].field, ContainerField::InitContainers);
    }

    #[test]
    fn test_image_strings_are_verbatim() {
        let extraction = extract(
            r#"
spec:
  template:
    spec:
      containers:
        - image: "  registry.example.com:5000/team/app@sha256:abc123  "
        - image: Docker.io/Library/Redis
"#,
        );
        assert_eq!(
            images(&extraction),
            vec![
                "  registry.example.com:5000/team/app@sha256:abc123  ",
                "Docker.io/Library/Redis"
            ]
        );
    }

    #[test]
    fn test_kinds_without_pod_spec_yield_nothing() {
        let extraction = extract("apiVersion: v1\nkind: Service\nspec:\n  ports:\n    - port: 80\n");
        assert!(extraction.images.is_empty());
        assert!(extraction.malformed.is_empty());
    }

    #[test]
    fn test_non_mapping_document_yields_nothing() {
        let extraction = extract("- just\n- a\n- list\n");
        assert!(extraction.images.is_empty());
        assert!(extraction.malformed.is_empty());
    }

    #[test]
    fn test_missing_image_skips_only_that_entry() {
        let extraction = extract(
            r#"
spec:
  template:
    spec:
      containers:
        - name: no-image
        - name: ok
          image: redis:7
        - name: numeric
          image: 42
"#,
        );
        assert_eq!(images(&extraction), vec!["redis:7"]);
        assert_eq!(extraction.malformed.len(), 2);
        assert_eq!(extraction.malformed[0].entry_index, Some(0));
        assert_eq!(extraction.malformed[1].entry_index, Some(2));
    }

    #[test]
    fn test_non_list_containers_is_malformed() {
        let extraction = extract("spec:\n  template:\n    spec:\n      containers:\n        image: nginx\n");
        assert!(extraction.images.is_empty());
        assert_eq!(extraction.malformed.len(), 1);
        assert_eq!(extraction.malformed[0].entry_index, None);
    }

    #[test]
    fn test_null_containers_is_absent() {
        let extraction = extract("spec:\n  template:\n    spec:\n      containers:\n");
        assert!(extraction.images.is_empty());
        assert!(extraction.malformed.is_empty());
    }

    #[test]
    fn test_cronjob_pod_template() {
        let extraction = extract(
            r#"
kind: CronJob
spec:
  schedule: "*/5 * * * *"
  jobTemplate:
    spec:
      template:
        spec:
          containers:
            - image: alpine:3.19
"#,
        );
        assert_eq!(images(&extraction), vec!["alpine:3.19"]);
    }

    #[test]
    fn test_bare_pod() {
        let extraction = extract(
            "kind: Pod\nspec:\n  containers:\n    - image: curlimages/curl:8.5.0\n",
        );
        assert_eq!(images(&extraction), vec!["curlimages/curl:8.5.0"]);
    }

    #[test]
    fn test_spec_containers_ignored_for_non_pod_kinds() {
        let extraction = extract("kind: Custom\nspec:\n  containers:\n    - image: nope:1\n");
        assert!(extraction.images.is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let extraction = extract(
            r#"
spec:
  template:
    spec:
      containers:
        - image: nginx:1.25
        - image: nginx:1.25
"#,
        );
        assert_eq!(images(&extraction), vec!["nginx:1.25", "nginx:1.25"]);
    }
}
