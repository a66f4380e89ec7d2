//! Use case orchestration for policyscan.
//!
//! This crate is the application layer. It owns the live state (policy store, diagnostic
//! registry, scan pipeline) and the use cases hosts call: scans, fixes, code actions, status and
//! explanations. Parsing and policy evaluation live in the domain crate; IO lives behind the
//! repo crate's ports.
//!
//! The CLI crate depends on this; it only handles argument parsing and I/O.

#![forbid(unsafe_code)]

mod actions;
mod error;
mod explain;
mod fixes;
mod pipeline;
mod policy_store;
mod registry;
mod render;
mod report;
mod scan;
mod service;
mod status;

pub use actions::{CodeAction, CodeActionProvider, Command, CommandOutcome};
pub use error::AppError;
pub use explain::{
    DecisionOutcome, KindExplanation, UnknownKind, explain_kind, resolve_kind, run_explain,
};
pub use fixes::{BatchFix, FixGenerator};
pub use pipeline::{
    EpochOutcome, EpochTicket, Pipeline, PipelineDeps, PipelineHandle, Trigger,
};
pub use policy_store::{ConfigBackend, FileConfigBackend, PolicyStore};
pub use registry::{DiagnosticRegistry, DiagnosticSink};
pub use render::{render_annotations, render_markdown, render_status};
pub use report::{
    build_report, exit_code, finding_url, parse_report_json, serialize_report, to_renderable,
};
pub use scan::{FixInput, FixOutput, ScanInput, ScanOutput, run_fix, run_scan, set_policy};
pub use service::{PolicyService, ServicePorts};
pub use status::{StatusReporter, StatusScope};
