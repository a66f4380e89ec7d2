use super::utils::find_match_ranges;
use crate::model::{Finding, VersionDirectiveFinding};
use once_cell::sync::Lazy;
use policyscan_types::{DocumentUri, FixEdit, Range, position_at};
use regex::Regex;

/// Every `.travis.yml` is a candidate; the parser decides.
pub const CONTENT_PATTERN: &str = "";
pub const FILE_PATTERN: &str = r"\.travis\.yml$";

pub const DIRECTIVE_NAME: &str = "go";

static DIRECTIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^go:)|(^language: go)").expect("valid regex"));
static GO_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"^go:").expect("valid regex"));

/// At most one finding: the first Go directive line.
pub fn parse(text: &str) -> Vec<Finding> {
    find_directive(text)
        .map(|range| {
            Finding::VersionDirective(VersionDirectiveFinding {
                name: DIRECTIVE_NAME.to_string(),
                range,
            })
        })
        .into_iter()
        .collect()
}

pub fn find_directive(text: &str) -> Option<Range> {
    find_match_ranges(text, &DIRECTIVE).into_iter().next()
}

/// Make the `go:` list include `required`.
///
/// Inserts the version after every `go:` line, or appends a new `go:` block when none exists.
/// Returns an empty edit when the token is already present anywhere in the text.
pub fn require_version(uri: &DocumentUri, text: &str, required: &str) -> FixEdit {
    let mut edit = FixEdit::new();
    if text.contains(required) {
        return edit;
    }

    let lists = find_match_ranges(text, &GO_LIST);
    if lists.is_empty() {
        edit.insert(
            uri,
            position_at(text, text.len()),
            format!("\n\ngo:\n  - \"{required}\"\n"),
        );
    } else {
        for range in lists {
            edit.insert(uri, range.end, format!("\n  - \"{required}\""));
        }
    }
    edit
}
