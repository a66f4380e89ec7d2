use policyscan_types::{Range, ids};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in finding kinds. Each kind owns a parser, a re-locate routine and a remediation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    NpmDependency,
    TravisGoVersion,
}

impl FindingKind {
    pub const ALL: [FindingKind; 2] = [FindingKind::NpmDependency, FindingKind::TravisGoVersion];

    /// Stable snake_case id used in config and reports.
    pub fn id(self) -> &'static str {
        match self {
            FindingKind::NpmDependency => ids::KIND_NPM_DEPENDENCY,
            FindingKind::TravisGoVersion => ids::KIND_TRAVIS_GO_VERSION,
        }
    }

    /// Prefix of the encoded diagnostic identity.
    pub fn tag(self) -> &'static str {
        match self {
            FindingKind::NpmDependency => ids::TAG_DEPENDENCY_RULES,
            FindingKind::TravisGoVersion => ids::TAG_TRAVIS_GO,
        }
    }

    /// Human label used in messages, e.g. "npm dependency".
    pub fn label(self) -> &'static str {
        match self {
            FindingKind::NpmDependency => "npm dependency",
            FindingKind::TravisGoVersion => "Travis CI Go version directive",
        }
    }

    /// One-sentence description of what the kind watches.
    pub fn summary(self) -> &'static str {
        match self {
            FindingKind::NpmDependency => {
                "Monitors and enforces rules about the use of npm dependencies."
            }
            FindingKind::TravisGoVersion => "Keeps Travis CI Go builds on the current Go release.",
        }
    }

    /// Upstream documentation for the configuration this kind inspects.
    pub fn docs_url(self) -> &'static str {
        match self {
            FindingKind::NpmDependency => {
                "https://docs.npmjs.com/cli/configuring-npm/package-json#dependencies"
            }
            FindingKind::TravisGoVersion => "https://docs.travis-ci.com/user/languages/go/",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A dependency declared in a package manifest.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyFinding {
    pub name: String,
    pub range: Range,
}

/// A CI configuration line that selects a toolchain version (e.g. `go:` in `.travis.yml`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionDirectiveFinding {
    pub name: String,
    pub range: Range,
}

/// A typed fact extracted from a document, tagged by kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Finding {
    Dependency(DependencyFinding),
    VersionDirective(VersionDirectiveFinding),
}

impl Finding {
    pub fn kind(&self) -> FindingKind {
        match self {
            Finding::Dependency(_) => FindingKind::NpmDependency,
            Finding::VersionDirective(_) => FindingKind::TravisGoVersion,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Finding::Dependency(d) => &d.name,
            Finding::VersionDirective(v) => &v.name,
        }
    }

    /// Range at extraction time. Fixes never trust this; they re-locate in current text.
    pub fn range(&self) -> Range {
        match self {
            Finding::Dependency(d) => d.range,
            Finding::VersionDirective(v) => v.range,
        }
    }

    pub fn key(&self) -> crate::policy::FindingKey {
        crate::policy::FindingKey::new(self.kind(), self.name())
    }
}
