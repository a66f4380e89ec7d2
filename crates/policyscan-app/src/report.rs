//! Scan report assembly and conversion to the renderable model.

use anyhow::Context;
use policyscan_domain::decode;
use policyscan_domain::model::{Finding, FindingKind};
use policyscan_render::{
    RenderableData, RenderableFinding, RenderableLocation, RenderableReport, RenderableSeverity,
    RenderableStatus,
};
use policyscan_types::{
    Diagnostic, DiagnosticSet, RunMeta, SCHEMA_SCAN_REPORT_V1, ScanReport, ScanSummary, Severity,
    StatusResult, StatusSnapshot, StatusState, ToolMeta,
};
use time::OffsetDateTime;

pub fn build_report(
    summary: ScanSummary,
    diagnostics: DiagnosticSet,
    status: StatusSnapshot,
    started_at: OffsetDateTime,
    ended_at: OffsetDateTime,
) -> ScanReport {
    let duration_ms = (ended_at - started_at).whole_milliseconds().max(0) as u64;
    ScanReport {
        schema: SCHEMA_SCAN_REPORT_V1.to_string(),
        tool: ToolMeta {
            name: "policyscan".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        run: RunMeta {
            started_at,
            ended_at,
            duration_ms,
        },
        summary,
        status,
        diagnostics,
    }
}

pub fn serialize_report(report: &ScanReport) -> anyhow::Result<Vec<u8>> {
    serde_json::to_vec_pretty(report).context("serialize scan report")
}

pub fn parse_report_json(text: &str) -> anyhow::Result<ScanReport> {
    let report: ScanReport = serde_json::from_str(text).context("parse report json")?;
    if report.schema != SCHEMA_SCAN_REPORT_V1 {
        anyhow::bail!("unknown report schema: {}", report.schema);
    }
    Ok(report)
}

/// Exit code for a finished scan: 2 when any diagnostic is an error, 0 otherwise.
pub fn exit_code(summary: &ScanSummary) -> i32 {
    if summary.errors > 0 { 2 } else { 0 }
}

pub fn to_renderable(report: &ScanReport) -> RenderableReport {
    let status = match &report.status.state {
        StatusState::Pending { .. } => RenderableStatus::Pending,
        StatusState::Completed {
            result: StatusResult::Success,
            ..
        } => RenderableStatus::Success,
        StatusState::Completed {
            result: StatusResult::Failure,
            ..
        } => RenderableStatus::Failure,
    };

    RenderableReport {
        status,
        status_message: report.status.state.message().to_string(),
        findings: report
            .diagnostics
            .diagnostics()
            .map(renderable_from_diagnostic)
            .collect(),
        data: RenderableData {
            documents_scanned: report.summary.documents_scanned,
            documents_with_findings: report.summary.documents_with_diagnostics,
            findings_total: report.summary.diagnostics_total,
            parse_failures: report.summary.parse_failures,
        },
    }
}

fn renderable_from_diagnostic(d: &Diagnostic) -> RenderableFinding {
    let finding = decode(&d.identity).ok();
    let path = match d.uri.repository() {
        "" => d.uri.path().to_string(),
        repo => format!("{repo}/{}", d.uri.path()),
    };
    RenderableFinding {
        severity: match d.severity {
            Severity::Warning => RenderableSeverity::Warning,
            Severity::Error => RenderableSeverity::Error,
        },
        kind: finding.as_ref().map(|f| f.kind().id().to_string()),
        message: d.message.clone(),
        location: Some(RenderableLocation {
            path,
            line: Some(d.range.start.line + 1),
            col: Some(d.range.start.character + 1),
        }),
        url: finding.as_ref().and_then(finding_url),
    }
}

/// Where a reader can learn more about a finding.
pub fn finding_url(finding: &Finding) -> Option<String> {
    match finding.kind() {
        FindingKind::NpmDependency => Some(format!(
            "https://www.npmjs.com/package/{}",
            finding.name()
        )),
        FindingKind::TravisGoVersion => Some(finding.kind().docs_url().to_string()),
    }
}
