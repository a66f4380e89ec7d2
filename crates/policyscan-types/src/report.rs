use crate::{DiagnosticSet, StatusSnapshot};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Stable schema identifier for the scan report.
pub const SCHEMA_SCAN_REPORT_V1: &str = "policyscan.report.v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunMeta {
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub ended_at: OffsetDateTime,
    pub duration_ms: u64,
}

/// Counters for one published epoch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScanSummary {
    pub epoch: u64,
    pub documents_scanned: u32,
    pub documents_with_diagnostics: u32,
    pub diagnostics_total: u32,
    pub errors: u32,
    pub warnings: u32,
    /// Documents whose text could not be parsed; they contribute no diagnostics.
    pub parse_failures: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScanReport {
    pub schema: String,
    pub tool: ToolMeta,
    pub run: RunMeta,
    pub summary: ScanSummary,
    pub status: StatusSnapshot,
    pub diagnostics: DiagnosticSet,
}
