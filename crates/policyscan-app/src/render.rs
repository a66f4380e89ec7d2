//! Render use cases: markdown, GitHub annotations and status text from in-memory reports.

use crate::report::to_renderable;
use policyscan_types::ScanReport;

pub fn render_markdown(report: &ScanReport) -> String {
    policyscan_render::render_markdown(&to_renderable(report))
}

pub fn render_annotations(report: &ScanReport, max: usize) -> Vec<String> {
    policyscan_render::render_github_annotations(&to_renderable(report))
        .into_iter()
        .take(max)
        .collect()
}

pub fn render_status(report: &ScanReport) -> String {
    policyscan_render::render_status(&report.status)
}
