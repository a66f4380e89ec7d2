use crate::{DocumentUri, Position, Range};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One edit operation. `replacement == None` deletes the range; an empty range with a
/// replacement is an insertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TextEdit {
    pub uri: DocumentUri,
    pub range: Range,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

/// Ordered list of edit operations, possibly spanning many documents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct FixEdit(Vec<TextEdit>);

impl FixEdit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(&mut self, uri: &DocumentUri, range: Range) {
        self.0.push(TextEdit {
            uri: uri.clone(),
            range,
            replacement: None,
        });
    }

    pub fn insert(&mut self, uri: &DocumentUri, at: Position, text: impl Into<String>) {
        self.0.push(TextEdit {
            uri: uri.clone(),
            range: Range::empty_at(at),
            replacement: Some(text.into()),
        });
    }

    /// Append the operations of `other` that are not already present, preserving order.
    pub fn extend(&mut self, other: FixEdit) {
        for edit in other.0 {
            if !self.0.contains(&edit) {
                self.0.push(edit);
            }
        }
    }

    pub fn edits(&self) -> &[TextEdit] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Distinct documents touched by this edit, in URI order.
    pub fn documents(&self) -> BTreeSet<&DocumentUri> {
        self.0.iter().map(|e| &e.uri).collect()
    }

    /// Apply the operations targeting `uri` to `text`.
    ///
    /// Operations are applied back to front so earlier positions stay valid. An operation that
    /// overlaps one already applied is skipped; insertions at the boundary of a replaced range
    /// still apply.
    pub fn apply_to(&self, uri: &DocumentUri, text: &str) -> String {
        let mut ops: Vec<(usize, usize, &str)> = self
            .0
            .iter()
            .filter(|e| &e.uri == uri)
            .map(|e| {
                (
                    offset_at(text, e.range.start),
                    offset_at(text, e.range.end),
                    e.replacement.as_deref().unwrap_or(""),
                )
            })
            .collect();
        ops.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));

        let mut out = text.to_string();
        let mut floor = text.len();
        for (start, end, replacement) in ops {
            let end = end.max(start);
            if end > floor {
                continue;
            }
            out.replace_range(start..end, replacement);
            floor = start;
        }
        out
    }
}

/// Byte offset of `pos` in `text`. Characters count Unicode scalar values; positions past the
/// end of a line clamp to the line end, and lines past the end clamp to the text end.
pub fn offset_at(text: &str, pos: Position) -> usize {
    let mut line_start = 0usize;
    for _ in 0..pos.line {
        match text[line_start..].find('\n') {
            Some(i) => line_start += i + 1,
            None => return text.len(),
        }
    }
    let line_end = text[line_start..]
        .find('\n')
        .map(|i| line_start + i)
        .unwrap_or(text.len());
    let line = &text[line_start..line_end];
    let within = line
        .char_indices()
        .nth(pos.character as usize)
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    line_start + within
}

/// Position of byte `offset` in `text` (clamped to the text end).
pub fn position_at(text: &str, offset: usize) -> Position {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &text[..offset];
    let line = before.bytes().filter(|&b| b == b'\n').count() as u32;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let character = before[line_start..].chars().count() as u32;
    Position::new(line, character)
}
