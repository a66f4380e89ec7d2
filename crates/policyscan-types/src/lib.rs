//! Stable DTOs and IDs used across the policyscan workspace.
//!
//! This crate is intentionally boring:
//! - document URIs, positions and ranges
//! - diagnostics, their opaque identity code, and the per-epoch diagnostic set
//! - text edits produced by fixes
//! - scan queries and matches exchanged with the corpus search backend
//! - status snapshots and the emitted scan report
//! - stable string IDs

#![forbid(unsafe_code)]

pub mod diagnostic;
pub mod edit;
pub mod ids;
pub mod report;
pub mod scan;
pub mod status;
pub mod uri;

pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticSet, Position, Range, Severity};
pub use edit::{FixEdit, TextEdit, offset_at, position_at};
pub use report::{RunMeta, SCHEMA_SCAN_REPORT_V1, ScanReport, ScanSummary, ToolMeta};
pub use scan::{FilterKind, Match, PathFilter, PatternKind, PatternSpec, ScanQuery, TextDocument};
pub use status::{
    NotificationKind, StatusNotification, StatusResult, StatusSnapshot, StatusState,
};
pub use uri::DocumentUri;
