use crate::DocumentUri;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Zero-based line/character position inside a document.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    JsonSchema,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Half-open range `[start, end)` inside a document.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    JsonSchema,
)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> Self {
        Self {
            start: Position::new(start_line, start_char),
            end: Position::new(end_line, end_char),
        }
    }

    pub fn empty_at(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True when the two ranges share at least one position (touching counts).
    pub fn intersects(&self, other: &Range) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Severity is intentionally small: it maps to the two non-allowed policy decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Opaque, decodable identity of the finding a diagnostic was raised for.
///
/// Wire form is `<TAG>:<json payload>`; the domain crate owns encoding and decoding.
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct DiagnosticCode(String);

impl DiagnosticCode {
    pub fn new<S: Into<String>>(s: S) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(tag, payload)` at the first `:`.
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once(':')
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Diagnostic {
    pub uri: DocumentUri,
    pub range: Range,
    pub message: String,
    pub severity: Severity,
    pub identity: DiagnosticCode,

    /// Stable hash of kind, document and finding name, intended for dedup and trending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// The full diagnostic set for one scan epoch, keyed by document.
///
/// Diagnostics within a document are ordered by range start. Documents without diagnostics are
/// never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DiagnosticSet(BTreeMap<DocumentUri, Vec<Diagnostic>>);

impl DiagnosticSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (DocumentUri, Vec<Diagnostic>)>,
    {
        let mut map: BTreeMap<DocumentUri, Vec<Diagnostic>> = BTreeMap::new();
        for (uri, diagnostics) in entries {
            if diagnostics.is_empty() {
                continue;
            }
            map.entry(uri).or_default().extend(diagnostics);
        }
        for diagnostics in map.values_mut() {
            diagnostics.sort_by(|a, b| {
                a.range
                    .start
                    .cmp(&b.range.start)
                    .then_with(|| a.identity.cmp(&b.identity))
            });
        }
        Self(map)
    }

    /// Diagnostics for one document, or an empty slice.
    pub fn get(&self, uri: &DocumentUri) -> &[Diagnostic] {
        self.0.get(uri).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of documents holding at least one diagnostic.
    pub fn document_count(&self) -> usize {
        self.0.len()
    }

    pub fn diagnostic_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DocumentUri, &[Diagnostic])> {
        self.0.iter().map(|(uri, diags)| (uri, diags.as_slice()))
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.values().flatten()
    }

    /// Ordered `(uri, diagnostics)` pairs, the shape accepted by diagnostic sinks.
    pub fn to_entries(&self) -> Vec<(DocumentUri, Vec<Diagnostic>)> {
        self.0
            .iter()
            .map(|(uri, diags)| (uri.clone(), diags.clone()))
            .collect()
    }
}
