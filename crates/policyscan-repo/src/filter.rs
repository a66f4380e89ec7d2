use crate::ScanError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use policyscan_types::{FilterKind, PathFilter};
use regex::Regex;

/// A [`PathFilter`] compiled for matching.
///
/// Regexp patterns are unanchored searches. An empty include list matches everything; a hit on
/// any exclude always rejects.
#[derive(Clone, Debug)]
pub enum CompiledFilter {
    Regexp {
        includes: Vec<Regex>,
        excludes: Vec<Regex>,
    },
    Glob {
        includes: Option<GlobSet>,
        excludes: GlobSet,
    },
}

impl CompiledFilter {
    pub fn compile(filter: &PathFilter) -> Result<Self, ScanError> {
        match filter.kind {
            FilterKind::Regexp => Ok(CompiledFilter::Regexp {
                includes: compile_regexes(&filter.includes)?,
                excludes: compile_regexes(&filter.excludes)?,
            }),
            FilterKind::Glob => Ok(CompiledFilter::Glob {
                includes: if filter.includes.is_empty() {
                    None
                } else {
                    Some(build_globset(&filter.includes)?)
                },
                excludes: build_globset(&filter.excludes)?,
            }),
        }
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        match self {
            CompiledFilter::Regexp { includes, excludes } => {
                let included = includes.is_empty() || includes.iter().any(|r| r.is_match(candidate));
                included && !excludes.iter().any(|r| r.is_match(candidate))
            }
            CompiledFilter::Glob { includes, excludes } => {
                let included = includes.as_ref().is_none_or(|set| set.is_match(candidate));
                included && !excludes.is_match(candidate)
            }
        }
    }
}

fn compile_regexes(patterns: &[String]) -> Result<Vec<Regex>, ScanError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ScanError::InvalidPattern {
                what: "regexp filter",
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        let glob = Glob::new(p).map_err(|e| ScanError::InvalidPattern {
            what: "glob filter",
            pattern: p.clone(),
            message: e.to_string(),
        })?;
        b.add(glob);
    }
    b.build().map_err(|e| ScanError::InvalidPattern {
        what: "glob filter",
        pattern: patterns.join(","),
        message: e.to_string(),
    })
}
