//! Renders a notification step's authored controls into a subject line and a
//! delivery-ready body.
//!
//! The core of the crate is a document rendering pipeline: an authored,
//! tree-shaped document is pruned by conditions, expanded by loops, run
//! through an embedded templating pass against the runtime payload,
//! optionally wrapped in an organization layout, and post-processed into
//! sanitized HTML. Persistence of layouts, organization settings, and
//! translation keys stays behind collaborator traits in
//! [`application::ports`]; the pipeline itself holds no state across calls.

pub mod application;
pub mod domain;
