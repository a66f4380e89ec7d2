use crate::{RenderableReport, RenderableSeverity};

/// Render findings as GitHub Actions workflow command annotations.
///
/// Format:
/// `::{level} file={path},line={line},col={col}::{message}`
pub fn render_github_annotations(report: &RenderableReport) -> Vec<String> {
    let mut out = Vec::new();

    for f in &report.findings {
        let level = match f.severity {
            RenderableSeverity::Error => "error",
            RenderableSeverity::Warning => "warning",
        };

        let mut meta = String::new();
        if let Some(loc) = &f.location {
            meta.push_str(&format!("file={}", escape_property(&loc.path)));
            if let Some(line) = loc.line {
                meta.push_str(&format!(",line={}", line));
            }
            if let Some(col) = loc.col {
                meta.push_str(&format!(",col={}", col));
            }
        }

        let kind = f.kind.as_deref().unwrap_or("policyscan");
        let message = escape_data(&format!("[{}] {}", kind, f.message));

        if meta.is_empty() {
            out.push(format!("::{}::{}", level, message));
        } else {
            out.push(format!("::{} {}::{}", level, meta, message));
        }
    }

    out
}

fn escape_data(v: &str) -> String {
    v.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(v: &str) -> String {
    escape_data(v).replace(':', "%3A").replace(',', "%2C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        RenderableData, RenderableFinding, RenderableLocation, RenderableReport, RenderableStatus,
    };

    fn report(findings: Vec<RenderableFinding>) -> RenderableReport {
        RenderableReport {
            status: RenderableStatus::Failure,
            status_message: String::new(),
            data: RenderableData {
                documents_scanned: 1,
                documents_with_findings: 1,
                findings_total: findings.len() as u32,
                parse_failures: 0,
            },
            findings,
        }
    }

    #[test]
    fn renders_level_location_and_escaped_message() {
        let lines = render_github_annotations(&report(vec![
            RenderableFinding {
                severity: RenderableSeverity::Error,
                kind: Some("npm_dependency".to_string()),
                message: "Forbidden npm dependency '100%'\nnext".to_string(),
                location: Some(RenderableLocation {
                    path: "web/package.json".to_string(),
                    line: Some(3),
                    col: Some(5),
                }),
                url: None,
            },
            RenderableFinding {
                severity: RenderableSeverity::Warning,
                kind: None,
                message: "no location".to_string(),
                location: None,
                url: None,
            },
        ]));

        assert_eq!(
            lines,
            vec![
                "::error file=web/package.json,line=3,col=5::[npm_dependency] Forbidden npm dependency '100%25'%0Anext".to_string(),
                "::warning::[policyscan] no location".to_string(),
            ]
        );
    }

    #[test]
    fn escapes_property_separators_in_paths() {
        let lines = render_github_annotations(&report(vec![RenderableFinding {
            severity: RenderableSeverity::Warning,
            kind: None,
            message: "m".to_string(),
            location: Some(RenderableLocation {
                path: "a,b:c".to_string(),
                line: None,
                col: None,
            }),
            url: None,
        }]));
        assert_eq!(lines[0], "::warning file=a%2Cb%3Ac::[policyscan] m");
    }
}
