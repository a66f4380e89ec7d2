use camino::Utf8Path;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical document identifier used in matches, diagnostics and edits.
///
/// The shape is `<repository>#<path>`, where `path` is relative to the repository root.
/// Normalization rules are intentionally simple and deterministic:
/// - always forward slashes (`/`)
/// - no leading `./` on the path
/// - a URI without `#` is a bare path with an empty repository
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct DocumentUri(String);

impl DocumentUri {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        let raw = s.as_ref();
        match raw.split_once('#') {
            Some((repo, path)) => Self::from_parts(repo, path),
            None => Self(normalize_path(raw)),
        }
    }

    pub fn from_parts(repository: &str, path: &str) -> Self {
        let repo = repository.replace('\\', "/");
        let repo = repo.trim_end_matches('/');
        Self(format!("{}#{}", repo, normalize_path(path)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Repository part of the URI (empty for bare paths).
    pub fn repository(&self) -> &str {
        self.0.split_once('#').map(|(r, _)| r).unwrap_or("")
    }

    /// Repository-relative path of the document.
    pub fn path(&self) -> &str {
        self.0.split_once('#').map(|(_, p)| p).unwrap_or(&self.0)
    }

    pub fn file_name(&self) -> Option<&str> {
        Utf8Path::new(self.path()).file_name()
    }
}

fn normalize_path(path: &str) -> String {
    let mut v = path.replace('\\', "/");
    while v.starts_with("./") {
        v = v.trim_start_matches("./").to_string();
    }
    v
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentUri {
    fn from(value: &str) -> Self {
        DocumentUri::new(value)
    }
}
