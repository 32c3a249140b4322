use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// One parsed YAML document from a rendered manifest file.
#[derive(Debug, Clone)]
pub struct ManifestDocument {
    pub source_file: PathBuf,
    /// Position among the non-empty documents of `source_file`, starting at 0.
    pub index: usize,
    pub value: Value,
}

impl ManifestDocument {
    pub fn kind(&self) -> Option<&str> {
        lookup(&self.value, &["kind"]).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        lookup(&self.value, &["metadata", "name"]).and_then(Value::as_str)
    }
}

/// A document that could not be parsed and was dropped.
#[derive(Debug, Clone)]
pub struct UnparsedDocument {
    pub index: usize,
    pub error: String,
}

/// Follow `path` through nested mappings. Missing keys, non-mapping
/// intermediates and YAML tags all resolve to `None` or are looked through.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(untagged(value), |current, key| current.get(*key).map(untagged))
}

pub fn untagged(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untagged(&tagged.value),
        other => other,
    }
}

/// Split a multi-document YAML stream on `---` / `...` markers at column 0.
///
/// Chunks that hold only comments, blank lines or directives are dropped.
pub fn split_documents(content: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in content.lines() {
        if let Some(rest) = document_start(line) {
            chunks.push(std::mem::take(&mut current));
            if !rest.is_empty() {
                current.push_str(rest);
                current.push('\n');
            }
        } else if is_document_end(line) {
            chunks.push(std::mem::take(&mut current));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    chunks.push(current);

    chunks.into_iter().filter(|c| !is_blank_chunk(c)).collect()
}

fn document_start(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("---")?;
    if rest.is_empty() {
        Some(rest)
    } else if rest.starts_with([' ', '\t']) {
        Some(rest.trim())
    } else {
        None
    }
}

fn is_document_end(line: &str) -> bool {
    match line.strip_prefix("...") {
        Some(rest) => rest.trim().is_empty() || rest.trim_start().starts_with('#'),
        None => false,
    }
}

fn is_blank_chunk(chunk: &str) -> bool {
    chunk.lines().all(|line| {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with('#') || line.starts_with('%')
    })
}

/// Parse every document in `content`. A malformed document is reported in the
/// second vector and never prevents its neighbours from parsing.
pub fn parse_documents(
    content: &str,
    source_file: &Path,
) -> (Vec<ManifestDocument>, Vec<UnparsedDocument>) {
    let mut documents = Vec::new();
    let mut unparsed = Vec::new();

    for (index, chunk) in split_documents(content).iter().enumerate() {
        match serde_yaml::from_str::<Value>(chunk) {
            Ok(value) => documents.push(ManifestDocument {
                source_file: source_file.to_path_buf(),
                index,
                value,
            }),
            Err(error) => unparsed.push(UnparsedDocument {
                index,
                error: error.to_string(),
            }),
        }
    }

    (documents, unparsed)
}
