use crate::checks::{self, ParseError};
use crate::fingerprint::fingerprint_for_finding;
use crate::identity::DiagnosticIdentity;
use crate::model::FindingKind;
use crate::policy::PolicyConfig;
use policyscan_types::{Diagnostic, DocumentUri};

/// Result of synthesizing one document.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub uri: DocumentUri,
    /// Ordered by range start.
    pub diagnostics: Vec<Diagnostic>,
    pub findings_total: usize,
    /// Set when the text could not be parsed; `diagnostics` is then empty.
    pub parse_error: Option<ParseError>,
}

/// Parse `text` with the `kind` parser and classify every finding against `policy`.
///
/// `Allowed` findings are suppressed. A parse failure yields no diagnostics for the document
/// and is reported back to the caller rather than raised.
pub fn synthesize_document(
    kind: FindingKind,
    uri: &DocumentUri,
    text: &str,
    policy: &PolicyConfig,
) -> DocumentOutcome {
    match classify(kind, uri, text, policy) {
        Ok((findings_total, diagnostics)) => DocumentOutcome {
            uri: uri.clone(),
            diagnostics,
            findings_total,
            parse_error: None,
        },
        Err(err) => DocumentOutcome {
            uri: uri.clone(),
            diagnostics: Vec::new(),
            findings_total: 0,
            parse_error: Some(err),
        },
    }
}

fn classify(
    kind: FindingKind,
    uri: &DocumentUri,
    text: &str,
    policy: &PolicyConfig,
) -> Result<(usize, Vec<Diagnostic>), ParseError> {
    let findings = checks::parse(kind, text)?;
    let total = findings.len();

    let mut diagnostics = Vec::with_capacity(total);
    for finding in findings {
        let decision = policy.decide(&finding.key());
        let Some(severity) = decision.severity() else {
            continue;
        };
        let message = format!(
            "{} {} '{}'",
            decision.label(),
            kind.label(),
            finding.name()
        );
        let fingerprint = fingerprint_for_finding(kind.id(), uri.as_str(), finding.name());
        let range = finding.range();
        let (_, code) = DiagnosticIdentity::new(finding)?.into_parts();
        diagnostics.push(Diagnostic {
            uri: uri.clone(),
            range,
            message,
            severity,
            identity: code,
            fingerprint: Some(fingerprint),
        });
    }

    diagnostics.sort_by(|a, b| {
        a.range
            .start
            .cmp(&b.range.start)
            .then_with(|| a.identity.cmp(&b.identity))
    });
    Ok((total, diagnostics))
}
