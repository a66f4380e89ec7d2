use crate::model::FindingKind;
use policyscan_types::{PathFilter, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tri-state classification of a finding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyDecision {
    #[serde(rename = "allow")]
    Allowed,
    #[serde(rename = "forbid")]
    Forbidden,
    #[default]
    #[serde(rename = "unreviewed")]
    Unreviewed,
}

impl PolicyDecision {
    /// Config spelling: `allow`, `forbid` or `unreviewed`.
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyDecision::Allowed => "allow",
            PolicyDecision::Forbidden => "forbid",
            PolicyDecision::Unreviewed => "unreviewed",
        }
    }

    pub fn parse(v: &str) -> Option<Self> {
        match v {
            "allow" | "allowed" => Some(PolicyDecision::Allowed),
            "forbid" | "forbidden" => Some(PolicyDecision::Forbidden),
            "unreviewed" => Some(PolicyDecision::Unreviewed),
            _ => None,
        }
    }

    /// Capitalized status used as the message prefix.
    pub fn label(self) -> &'static str {
        match self {
            PolicyDecision::Allowed => "Allowed",
            PolicyDecision::Forbidden => "Forbidden",
            PolicyDecision::Unreviewed => "Unreviewed",
        }
    }

    /// `None` for `Allowed`: no diagnostic is raised.
    pub fn severity(self) -> Option<Severity> {
        match self {
            PolicyDecision::Allowed => None,
            PolicyDecision::Forbidden => Some(Severity::Error),
            PolicyDecision::Unreviewed => Some(Severity::Warning),
        }
    }
}

impl fmt::Display for PolicyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy lookup key: a finding kind plus the finding's name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FindingKey {
    pub kind: FindingKind,
    pub name: String,
}

impl FindingKey {
    pub fn new(kind: FindingKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for FindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind.id(), self.name)
    }
}

/// Where a policy update should apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyScope {
    Repository,
    Global,
}

/// Explicit decisions keyed by finding. Missing keys are `Unreviewed`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyConfig {
    rules: BTreeMap<FindingKey, PolicyDecision>,
}

impl PolicyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decide(&self, key: &FindingKey) -> PolicyDecision {
        self.rules.get(key).copied().unwrap_or_default()
    }

    pub fn set(&mut self, key: FindingKey, decision: PolicyDecision) {
        self.rules.insert(key, decision);
    }

    pub fn with(mut self, key: FindingKey, decision: PolicyDecision) -> Self {
        self.set(key, decision);
        self
    }

    /// Merge-patch: entries in `patch` override, nothing is removed.
    pub fn merge(&mut self, patch: &PolicyConfig) {
        for (key, decision) in &patch.rules {
            self.rules.insert(key.clone(), *decision);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FindingKey, PolicyDecision)> {
        self.rules.iter().map(|(k, d)| (k, *d))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<(FindingKey, PolicyDecision)> for PolicyConfig {
    fn from_iter<T: IntoIterator<Item = (FindingKey, PolicyDecision)>>(iter: T) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

pub const DEFAULT_MAX_RESULTS: usize = 200;
pub const DEFAULT_REQUIRED_GO_VERSION: &str = "1.13.x";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckPolicy {
    pub enabled: bool,
    /// Version token a CI directive must list; only meaningful for directive kinds.
    pub required_version: Option<String>,
}

impl CheckPolicy {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            required_version: None,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            required_version: None,
        }
    }
}

/// Scan scope and per-kind settings. Policy decisions live in [`PolicyConfig`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub repositories: PathFilter,
    pub max_results: usize,
    pub checks: BTreeMap<FindingKind, CheckPolicy>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        let mut checks = BTreeMap::new();
        checks.insert(FindingKind::NpmDependency, CheckPolicy::enabled());
        checks.insert(
            FindingKind::TravisGoVersion,
            CheckPolicy {
                enabled: true,
                required_version: Some(DEFAULT_REQUIRED_GO_VERSION.to_string()),
            },
        );
        Self {
            repositories: PathFilter::default(),
            max_results: DEFAULT_MAX_RESULTS,
            checks,
        }
    }
}

impl EffectiveConfig {
    pub fn check_policy(&self, kind: FindingKind) -> Option<&CheckPolicy> {
        self.checks.get(&kind).filter(|p| p.enabled)
    }

    pub fn enabled_kinds(&self) -> impl Iterator<Item = FindingKind> + '_ {
        FindingKind::ALL
            .into_iter()
            .filter(|k| self.check_policy(*k).is_some())
    }

    pub fn required_go_version(&self) -> &str {
        self.checks
            .get(&FindingKind::TravisGoVersion)
            .and_then(|p| p.required_version.as_deref())
            .unwrap_or(DEFAULT_REQUIRED_GO_VERSION)
    }
}
