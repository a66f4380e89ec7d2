use super::ParseError;
use super::utils::find_first_literal;
use crate::model::{DependencyFinding, Finding, FindingKind};
use policyscan_types::{DocumentUri, FixEdit, Position, Range};
use serde_json::Value;
use std::collections::BTreeSet;

pub const CONTENT_PATTERN: &str = r#"[Dd]ependencies""#;
pub const FILE_PATTERN: &str = r"(^|/)package\.json$";

const SECTIONS: [&str; 3] = ["dependencies", "devDependencies", "peerDependencies"];

/// Parse every declared dependency name out of a `package.json`.
///
/// Names are de-duplicated across sections. A name whose quoted token cannot be found fails the
/// whole document.
pub fn parse(text: &str) -> Result<Vec<Finding>, ParseError> {
    let data: Value = serde_json::from_str(text)?;

    let mut names = BTreeSet::new();
    for section in SECTIONS {
        if let Some(deps) = data.get(section).and_then(Value::as_object) {
            names.extend(deps.keys().cloned());
        }
    }

    names
        .into_iter()
        .map(|name| {
            let range = find_dependency_range(text, &name).ok_or_else(|| ParseError::Unlocated {
                kind: FindingKind::NpmDependency,
                name: name.clone(),
            })?;
            Ok(Finding::Dependency(DependencyFinding { name, range }))
        })
        .collect()
}

/// Range of the first `"<name>"` token in the text.
pub fn find_dependency_range(text: &str, name: &str) -> Option<Range> {
    find_first_literal(text, &format!("\"{name}\""))
}

/// Delete the whole line holding the declaration at `range`.
///
/// Assumes the declaration sits on one line and appears once.
pub fn remove_declaration(uri: &DocumentUri, range: Range) -> FixEdit {
    let mut edit = FixEdit::new();
    edit.delete(
        uri,
        Range {
            start: Position::new(range.start.line, 0),
            end: Position::new(range.end.line + 1, 0),
        },
    );
    edit
}
