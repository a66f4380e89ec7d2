use crate::identity::encode;
use crate::model::{DependencyFinding, Finding, VersionDirectiveFinding};
use policyscan_types::{Diagnostic, DocumentUri, Range, Severity};

pub fn dependency_finding(name: &str, line: u32) -> Finding {
    Finding::Dependency(DependencyFinding {
        name: name.to_string(),
        range: Range::new(line, 4, line, 6 + name.chars().count() as u32),
    })
}

pub fn dependency_diagnostic(uri: &str, name: &str, line: u32) -> Diagnostic {
    diagnostic(uri, dependency_finding(name, line), Severity::Warning)
}

pub fn directive_diagnostic(uri: &str) -> Diagnostic {
    let finding = Finding::VersionDirective(VersionDirectiveFinding {
        name: "go".to_string(),
        range: Range::new(0, 0, 0, 3),
    });
    diagnostic(uri, finding, Severity::Warning)
}

fn diagnostic(uri: &str, finding: Finding, severity: Severity) -> Diagnostic {
    Diagnostic {
        uri: DocumentUri::new(uri),
        range: finding.range(),
        message: format!("Unreviewed {} '{}'", finding.kind().label(), finding.name()),
        severity,
        identity: encode(&finding).expect("encode"),
        fingerprint: None,
    }
}
