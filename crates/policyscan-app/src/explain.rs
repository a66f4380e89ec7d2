//! The `explain` use case: what a finding kind scans for, and what the loaded policy does with it.

use crate::policy_store::{FileConfigBackend, PolicyStore};
use camino::Utf8Path;
use policyscan_domain::checks;
use policyscan_domain::fix::offered_remediation;
use policyscan_domain::model::FindingKind;
use policyscan_domain::policy::PolicyDecision;
use policyscan_settings::{Overrides, ResolvedConfig};
use policyscan_types::{FilterKind, PathFilter, PatternKind, ScanQuery, Severity};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kind or tag: {identifier} (expected one of: {})", known_identifiers().join(", "))]
pub struct UnknownKind {
    pub identifier: String,
}

fn known_identifiers() -> Vec<&'static str> {
    let ids = FindingKind::ALL.iter().map(|k| k.id());
    let tags = FindingKind::ALL.iter().map(|k| k.tag());
    ids.chain(tags).collect()
}

/// Accepts a kind id (`npm_dependency`) or an identity tag (`DEPENDENCY_RULES`).
pub fn resolve_kind(identifier: &str) -> Result<FindingKind, UnknownKind> {
    FindingKind::from_id(identifier)
        .or_else(|| FindingKind::from_tag(identifier))
        .ok_or_else(|| UnknownKind {
            identifier: identifier.to_string(),
        })
}

/// What a finding classified with `decision` turns into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionOutcome {
    pub decision: PolicyDecision,
    /// `None` when no diagnostic is raised.
    pub severity: Option<Severity>,
    /// Title of the text fix offered, if any.
    pub fix: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindExplanation {
    pub kind: FindingKind,
    pub enabled: bool,
    pub query: ScanQuery,
    /// One entry per decision, in `allow`, `unreviewed`, `forbid` order.
    pub decisions: Vec<DecisionOutcome>,
    /// Explicit decisions recorded for this kind, by name.
    pub rules: Vec<(String, PolicyDecision)>,
}

pub fn explain_kind(kind: FindingKind, cfg: &ResolvedConfig) -> KindExplanation {
    let decisions = [
        PolicyDecision::Allowed,
        PolicyDecision::Unreviewed,
        PolicyDecision::Forbidden,
    ]
    .into_iter()
    .map(|decision| DecisionOutcome {
        decision,
        severity: decision.severity(),
        fix: offered_remediation(kind, decision).map(|r| r.title(&cfg.effective)),
    })
    .collect();

    let rules = cfg
        .policy
        .iter()
        .filter(|(key, _)| key.kind == kind)
        .map(|(key, decision)| (key.name.clone(), decision))
        .collect();

    KindExplanation {
        kind,
        enabled: cfg.effective.check_policy(kind).is_some(),
        query: checks::scan_query(kind, &cfg.effective),
        decisions,
        rules,
    }
}

/// Load `policyscan.toml` (defaults when missing) and explain `identifier` against it.
pub async fn run_explain(
    config_path: &Utf8Path,
    overrides: Overrides,
    identifier: &str,
) -> anyhow::Result<KindExplanation> {
    let kind = resolve_kind(identifier)?;
    let backend = Arc::new(FileConfigBackend::new(config_path));
    let store = PolicyStore::load(backend, overrides).await?;
    Ok(explain_kind(kind, &store.current()))
}

fn write_filter(f: &mut fmt::Formatter<'_>, filter: &PathFilter) -> fmt::Result {
    let kind = match filter.kind {
        FilterKind::Regexp => "regexp",
        FilterKind::Glob => "glob",
    };
    if filter.includes.is_empty() {
        write!(f, "all")?;
    } else {
        write!(f, "{kind} {}", filter.includes.join(", "))?;
    }
    if !filter.excludes.is_empty() {
        write!(f, " (excluding {})", filter.excludes.join(", "))?;
    }
    Ok(())
}

impl fmt::Display for KindExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.enabled { "enabled" } else { "disabled" };
        writeln!(f, "{} ({}, {state})", self.kind.id(), self.kind.tag())?;
        writeln!(f, "{}", self.kind.summary())?;
        writeln!(f)?;

        let pattern_kind = match self.query.pattern.kind {
            PatternKind::Literal => "literal",
            PatternKind::Regexp => "regexp",
        };
        writeln!(f, "Scan")?;
        writeln!(f, "  content:      {pattern_kind} {:?}", self.query.pattern.pattern)?;
        write!(f, "  files:        ")?;
        write_filter(f, &self.query.files)?;
        write!(f, "\n  repositories: ")?;
        write_filter(f, &self.query.repositories)?;
        writeln!(f, "\n  limit:        {} matches per query", self.query.max_results)?;
        writeln!(f)?;

        writeln!(f, "Decisions")?;
        for outcome in &self.decisions {
            let raised = match outcome.severity {
                None => "no diagnostic",
                Some(Severity::Warning) => "warning",
                Some(Severity::Error) => "error",
            };
            write!(f, "  {:<11} {raised}", outcome.decision.as_str())?;
            match &outcome.fix {
                Some(title) => writeln!(f, "; fix: {title}")?,
                None if outcome.severity.is_some() => writeln!(f, "; no text fix")?,
                None => writeln!(f)?,
            }
        }
        writeln!(f)?;

        writeln!(f, "Rules [rules.{}]", self.kind.id())?;
        if self.rules.is_empty() {
            writeln!(f, "  (none; every name is unreviewed)")?;
        }
        for (name, decision) in &self.rules {
            writeln!(f, "  {name} = {decision}")?;
        }
        writeln!(f)?;
        writeln!(f, "Docs: {}", self.kind.docs_url())
    }
}
