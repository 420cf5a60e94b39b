//! Rendering pipeline for notification step output.
//!
//! The pipeline is kept free of persistence: it accepts authored controls
//! and a runtime payload, produces a deterministic subject/body pair, and
//! surfaces structured errors for authoring defects. Layout documents,
//! organization settings, and translations are reached through the
//! collaborator traits in [`crate::application::ports`].

mod service;
mod types;

pub use service::{BRANDING_HTML, MessageOutputRenderer, RendererConfig};
pub use types::{
    ControlValues, LayoutChoice, RenderCommand, RenderError, RenderOutput, RenderPayload,
    WorkflowRef,
};
