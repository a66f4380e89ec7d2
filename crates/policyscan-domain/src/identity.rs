//! Diagnostic identity codec.
//!
//! A diagnostic carries its originating finding as `<TAG>:<json payload>`. `encode` and `decode`
//! are an exact pair: decoding an encoded finding reproduces it field for field.

use crate::model::{DependencyFinding, Finding, FindingKind, VersionDirectiveFinding};
use policyscan_types::DiagnosticCode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("diagnostic code has no tag separator: {0}")]
    MissingTag(String),

    #[error("unknown diagnostic tag: {0}")]
    UnknownTag(String),

    #[error("malformed {tag} payload: {message}")]
    Payload { tag: &'static str, message: String },

    #[error("identity does not round-trip: {0}")]
    RoundTrip(String),
}

pub fn encode(finding: &Finding) -> Result<DiagnosticCode, IdentityError> {
    let tag = finding.kind().tag();
    let payload = match finding {
        Finding::Dependency(d) => serde_json::to_string(d),
        Finding::VersionDirective(v) => serde_json::to_string(v),
    }
    .map_err(|e| IdentityError::Payload {
        tag,
        message: e.to_string(),
    })?;
    Ok(DiagnosticCode::new(format!("{tag}:{payload}")))
}

pub fn decode(code: &DiagnosticCode) -> Result<Finding, IdentityError> {
    let (tag, payload) = code
        .split()
        .ok_or_else(|| IdentityError::MissingTag(code.as_str().to_string()))?;
    let kind = FindingKind::from_tag(tag).ok_or_else(|| IdentityError::UnknownTag(tag.to_string()))?;
    let malformed = |e: serde_json::Error| IdentityError::Payload {
        tag: kind.tag(),
        message: e.to_string(),
    };
    match kind {
        FindingKind::NpmDependency => serde_json::from_str::<DependencyFinding>(payload)
            .map(Finding::Dependency)
            .map_err(malformed),
        FindingKind::TravisGoVersion => serde_json::from_str::<VersionDirectiveFinding>(payload)
            .map(Finding::VersionDirective)
            .map_err(malformed),
    }
}

/// A finding paired with its encoded code, verified to round-trip at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticIdentity {
    finding: Finding,
    code: DiagnosticCode,
}

impl DiagnosticIdentity {
    pub fn new(finding: Finding) -> Result<Self, IdentityError> {
        let code = encode(&finding)?;
        let decoded = decode(&code)?;
        if decoded != finding {
            return Err(IdentityError::RoundTrip(code.as_str().to_string()));
        }
        Ok(Self { finding, code })
    }

    pub fn from_code(code: &DiagnosticCode) -> Result<Self, IdentityError> {
        let finding = decode(code)?;
        Ok(Self {
            finding,
            code: code.clone(),
        })
    }

    pub fn finding(&self) -> &Finding {
        &self.finding
    }

    pub fn code(&self) -> &DiagnosticCode {
        &self.code
    }

    pub fn into_parts(self) -> (Finding, DiagnosticCode) {
        (self.finding, self.code)
    }
}
