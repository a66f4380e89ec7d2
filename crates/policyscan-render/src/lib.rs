//! Rendering utilities for terminal and CI surfaces (Markdown, GitHub annotations, status).

#![forbid(unsafe_code)]

mod gha;
mod markdown;
mod model;
mod status;

pub use gha::render_github_annotations;
pub use markdown::render_markdown;
pub use model::{
    RenderableData, RenderableFinding, RenderableLocation, RenderableReport, RenderableSeverity,
    RenderableStatus,
};
pub use status::render_status;
