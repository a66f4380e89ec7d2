//! Local fix computation against a document's current text.

use crate::checks::{self, npm_dependency, travis_go};
use crate::model::{Finding, FindingKind};
use crate::policy::{EffectiveConfig, PolicyDecision};
use policyscan_types::{FixEdit, TextDocument};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixError {
    #[error("{kind} '{name}' is no longer present in {uri}")]
    TargetMissing {
        kind: FindingKind,
        name: String,
        uri: String,
    },

    #[error("no text fix is offered for {decision} {kind} '{name}'")]
    NotOffered {
        kind: FindingKind,
        decision: PolicyDecision,
        name: String,
    },
}

/// Text remediation a kind offers for a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Remediation {
    /// Delete the declaring line.
    RemoveDeclaration,
    /// Make the CI directive list the required version.
    RequireVersion,
}

impl Remediation {
    pub fn title(self, cfg: &EffectiveConfig) -> String {
        match self {
            Remediation::RemoveDeclaration => {
                "Remove dependency from package.json (further edits required)".to_string()
            }
            Remediation::RequireVersion => {
                format!("Use current Go version ({})", cfg.required_go_version())
            }
        }
    }
}

/// `Allowed` never offers a text fix. Dependencies are only removable once forbidden;
/// directives are upgradable whenever they are not allowed.
pub fn offered_remediation(kind: FindingKind, decision: PolicyDecision) -> Option<Remediation> {
    match (kind, decision) {
        (_, PolicyDecision::Allowed) => None,
        (FindingKind::NpmDependency, PolicyDecision::Forbidden) => {
            Some(Remediation::RemoveDeclaration)
        }
        (FindingKind::NpmDependency, PolicyDecision::Unreviewed) => None,
        (FindingKind::TravisGoVersion, _) => Some(Remediation::RequireVersion),
    }
}

/// Compute the edit remediating `finding` in `document`.
///
/// The finding is re-located in the current text first; the range recorded at synthesis time is
/// not trusted.
pub fn compute_local_fix(
    finding: &Finding,
    decision: PolicyDecision,
    document: &TextDocument,
    cfg: &EffectiveConfig,
) -> Result<FixEdit, FixError> {
    let remediation =
        offered_remediation(finding.kind(), decision).ok_or_else(|| FixError::NotOffered {
            kind: finding.kind(),
            decision,
            name: finding.name().to_string(),
        })?;

    let range = checks::locate(finding, &document.text).ok_or_else(|| FixError::TargetMissing {
        kind: finding.kind(),
        name: finding.name().to_string(),
        uri: document.uri.as_str().to_string(),
    })?;

    Ok(match remediation {
        Remediation::RemoveDeclaration => npm_dependency::remove_declaration(&document.uri, range),
        Remediation::RequireVersion => {
            travis_go::require_version(&document.uri, &document.text, cfg.required_go_version())
        }
    })
}
