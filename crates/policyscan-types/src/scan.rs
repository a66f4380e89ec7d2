use crate::DocumentUri;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Literal,
    Regexp,
}

/// Text pattern searched for inside candidate files.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PatternSpec {
    pub pattern: String,
    pub kind: PatternKind,
}

impl PatternSpec {
    pub fn regexp(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: PatternKind::Regexp,
        }
    }

    pub fn literal(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            kind: PatternKind::Literal,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    Regexp,
    Glob,
}

/// Include/exclude pattern sets for repositories or files.
///
/// An empty `includes` list includes everything; `excludes` always wins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct PathFilter {
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub kind: FilterKind,
}

impl PathFilter {
    pub fn regexp<I, S>(includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            includes: includes.into_iter().map(Into::into).collect(),
            excludes: Vec::new(),
            kind: FilterKind::Regexp,
        }
    }

    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = excludes.into_iter().map(Into::into).collect();
        self
    }
}

/// Request sent to the corpus search backend. Structural equality is the memo key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ScanQuery {
    pub pattern: PatternSpec,
    pub repositories: PathFilter,
    pub files: PathFilter,
    /// Hard cutoff on the number of matches; extra matches are dropped, not reported.
    pub max_results: usize,
}

/// A document that a scan identified as containing candidate content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Match {
    pub uri: DocumentUri,
    pub preview: String,
}

/// Full text of an opened document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TextDocument {
    pub uri: DocumentUri,
    pub text: String,
}

impl TextDocument {
    pub fn new(uri: DocumentUri, text: impl Into<String>) -> Self {
        Self {
            uri,
            text: text.into(),
        }
    }
}
