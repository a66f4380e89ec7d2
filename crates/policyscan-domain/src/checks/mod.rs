//! Kind-specific scan queries, parsers and re-locate routines.

use crate::model::{Finding, FindingKind};
use crate::policy::EffectiveConfig;
use policyscan_types::{PathFilter, PatternSpec, Range, ScanQuery};

pub mod npm_dependency;
pub mod travis_go;
mod utils;


#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} '{name}' is declared but its token was not found in the text")]
    Unlocated { kind: FindingKind, name: String },

    #[error(transparent)]
    Identity(#[from] crate::identity::IdentityError),
}

/// The corpus query that finds candidate documents for `kind`.
pub fn scan_query(kind: FindingKind, cfg: &EffectiveConfig) -> ScanQuery {
    let (pattern, file_pattern) = match kind {
        FindingKind::NpmDependency => (npm_dependency::CONTENT_PATTERN, npm_dependency::FILE_PATTERN),
        FindingKind::TravisGoVersion => (travis_go::CONTENT_PATTERN, travis_go::FILE_PATTERN),
    };
    ScanQuery {
        pattern: PatternSpec::regexp(pattern),
        repositories: cfg.repositories.clone(),
        files: PathFilter::regexp([file_pattern]),
        max_results: cfg.max_results,
    }
}

/// Extract every finding of `kind` from `text`.
pub fn parse(kind: FindingKind, text: &str) -> Result<Vec<Finding>, ParseError> {
    match kind {
        FindingKind::NpmDependency => npm_dependency::parse(text),
        FindingKind::TravisGoVersion => Ok(travis_go::parse(text)),
    }
}

/// Re-run the kind's match routine for `finding` against current `text`.
///
/// Only the identifying payload is used; the finding's stored range is ignored.
pub fn locate(finding: &Finding, text: &str) -> Option<Range> {
    match finding {
        Finding::Dependency(d) => npm_dependency::find_dependency_range(text, &d.name),
        Finding::VersionDirective(_) => travis_go::find_directive(text),
    }
}
