use crate::{RenderableReport, RenderableSeverity, RenderableStatus};

pub fn render_markdown(report: &RenderableReport) -> String {
    let mut out = String::new();

    out.push_str("# Policyscan report\n\n");
    let status = match report.status {
        RenderableStatus::Pending => "PENDING",
        RenderableStatus::Success => "SUCCESS",
        RenderableStatus::Failure => "FAILURE",
    };
    out.push_str(&format!(
        "- Status: **{}** ({})\n- Documents: {} scanned, {} with findings\n- Findings: {}\n\n",
        status,
        report.status_message,
        report.data.documents_scanned,
        report.data.documents_with_findings,
        report.data.findings_total
    ));

    if report.data.parse_failures > 0 {
        out.push_str(&format!(
            "> Note: {} document(s) could not be parsed and were skipped\n\n",
            report.data.parse_failures
        ));
    }

    if report.findings.is_empty() {
        out.push_str("No findings.\n");
        return out;
    }

    out.push_str("## Findings\n\n");

    for f in &report.findings {
        let sev = match f.severity {
            RenderableSeverity::Warning => "WARN",
            RenderableSeverity::Error => "ERROR",
        };

        let kind = f.kind.as_deref().unwrap_or("");
        match &f.location {
            Some(loc) => out.push_str(&format!(
                "- [{}] `{}` {} (`{}`:{})\n",
                sev,
                kind,
                f.message,
                loc.path,
                loc.line.unwrap_or(0)
            )),
            None => out.push_str(&format!("- [{}] `{}` {}\n", sev, kind, f.message)),
        }

        if let Some(url) = &f.url {
            out.push_str(&format!("  - url: {}\n", url));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RenderableData, RenderableFinding, RenderableLocation};

    fn data(findings_total: u32, parse_failures: u32) -> RenderableData {
        RenderableData {
            documents_scanned: 3,
            documents_with_findings: findings_total.min(1),
            findings_total,
            parse_failures,
        }
    }

    #[test]
    fn renders_empty_report() {
        let report = RenderableReport {
            status: RenderableStatus::Success,
            status_message: "All findings in use are approved".to_string(),
            findings: Vec::new(),
            data: data(0, 0),
        };
        let md = render_markdown(&report);
        assert!(md.contains("Status: **SUCCESS**"));
        assert!(md.contains("No findings"));
        assert!(!md.contains("> Note"));
    }

    #[test]
    fn renders_findings_with_location_url_and_parse_failures() {
        let report = RenderableReport {
            status: RenderableStatus::Failure,
            status_message: "1 unapproved finding in 1 document".to_string(),
            findings: vec![RenderableFinding {
                severity: RenderableSeverity::Error,
                kind: Some("npm_dependency".to_string()),
                message: "Forbidden npm dependency 'left-pad'".to_string(),
                location: Some(RenderableLocation {
                    path: "web/package.json".to_string(),
                    line: Some(4),
                    col: Some(5),
                }),
                url: Some("https://www.npmjs.com/package/left-pad".to_string()),
            }],
            data: data(1, 2),
        };

        let md = render_markdown(&report);
        assert!(md.contains("Status: **FAILURE** (1 unapproved finding in 1 document)"));
        assert!(md.contains("> Note: 2 document(s) could not be parsed"));
        assert!(md.contains("## Findings"));
        assert!(md.contains("[ERROR] `npm_dependency` Forbidden npm dependency 'left-pad'"));
        assert!(md.contains("`web/package.json`:4"));
        assert!(md.contains("url: https://www.npmjs.com/package/left-pad"));
    }

    #[test]
    fn renders_finding_without_location() {
        let report = RenderableReport {
            status: RenderableStatus::Failure,
            status_message: "1 unapproved finding in 1 document".to_string(),
            findings: vec![RenderableFinding {
                severity: RenderableSeverity::Warning,
                kind: None,
                message: "Unreviewed Travis CI Go version directive 'go'".to_string(),
                location: None,
                url: None,
            }],
            data: data(1, 0),
        };

        let md = render_markdown(&report);
        assert!(md.contains("[WARN]"));
        assert!(md.contains("Unreviewed Travis CI Go version directive 'go'"));
        assert!(!md.contains("url:"));
    }
}
