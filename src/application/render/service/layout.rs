//! Layout composition around rendered step content.

use tracing::debug;

use crate::application::ports::{
    ControlLevel, LayoutControls, LayoutControlsQuery, LayoutControlsStore, LayoutResolver,
};
use crate::application::render::types::{LayoutChoice, RenderError, WorkflowRef};
use crate::domain::document::{DocumentNode, attr, kind};

use super::postprocess::BRANDING_HTML;

/// Reserved payload key a layout's content slot is bound to.
pub(crate) const CONTENT_SLOT_KEY: &str = "content";

const DOCTYPE_DECLARATION: &str = "<!DOCTYPE html>";

/// Trailing marker some upstream renderers leave behind step HTML.
const TRAILING_SENTINEL_COMMENT: &str = "<!--/$-->";

/// Resolve which layout's controls apply to this render, honoring the
/// three-valued selection: an explicit id, explicitly no layout, or the
/// organization default. A missing layout or missing controls is a normal
/// state, not a failure.
pub async fn resolve_layout_controls(
    resolver: &dyn LayoutResolver,
    store: &dyn LayoutControlsStore,
    choice: &LayoutChoice,
    workflow: &WorkflowRef,
) -> Result<Option<LayoutControls>, RenderError> {
    let explicit_id = match choice {
        LayoutChoice::Null => return Ok(None),
        LayoutChoice::Id(id) => Some(id.as_str()),
        LayoutChoice::Unset => None,
    };

    let Some(identity) = resolver.resolve(explicit_id, workflow).await? else {
        debug!(
            explicit_id = explicit_id.unwrap_or("<default>"),
            "no layout resolved; rendering step content directly"
        );
        return Ok(None);
    };

    let query = LayoutControlsQuery {
        organization_id: workflow.organization_id.clone(),
        environment_id: workflow.environment_id.clone(),
        layout_id: identity.layout_id.clone(),
        level: ControlLevel::LayoutControls,
    };
    let Some(controls) = store.find(&query).await? else {
        debug!(
            layout_id = %identity.layout_id,
            "layout has no persisted controls; rendering step content directly"
        );
        return Ok(None);
    };

    Ok(Some(controls))
}

/// Strip wrapper artifacts from step HTML before binding it into a
/// layout's content slot: any doctype, the trailing sentinel comment, an
/// already-present branding fragment (the composed output is branded once,
/// at the end), and embedded newlines.
pub fn clean_step_html(html: &str) -> String {
    html.replace(DOCTYPE_DECLARATION, "")
        .replace(TRAILING_SENTINEL_COMMENT, "")
        .replace(BRANDING_HTML, "")
        .replace('\n', "")
}

/// Replace the reserved content-slot variable in a layout tree with a raw
/// node holding the slot expression. The substituted step HTML is already
/// rendered markup and must be emitted verbatim, not entity-escaped like
/// authored text; this keeps tree layouts consistent with plain-HTML
/// layouts, where the slot is injected raw by plain substitution.
pub fn bind_content_slot(mut node: DocumentNode) -> DocumentNode {
    if node.kind == kind::VARIABLE && node.attr_str(attr::ID) == Some(CONTENT_SLOT_KEY) {
        let mut slot = DocumentNode::new(kind::RAW_HTML);
        slot.text = Some(format!("{{{{ {CONTENT_SLOT_KEY} }}}}"));
        return slot;
    }
    if let Some(content) = node.content.take() {
        node.content = Some(content.into_iter().map(bind_content_slot).collect());
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_strips_doctype_sentinel_branding_and_newlines() {
        let html = format!(
            "<!DOCTYPE html><p>Content</p>\n{BRANDING_HTML}<!--/$-->"
        );
        assert_eq!(clean_step_html(&html), "<p>Content</p>");
    }

    #[test]
    fn cleaning_leaves_plain_markup_alone() {
        assert_eq!(clean_step_html("<p>hi</p>"), "<p>hi</p>");
    }

    #[test]
    fn content_slot_variable_becomes_a_raw_node() {
        let tree: DocumentNode = serde_json::from_value(serde_json::json!({
            "type": "doc",
            "content": [{
                "type": "paragraph",
                "content": [
                    { "type": "text", "text": "Layout: " },
                    { "type": "variable", "attrs": { "id": "content" } },
                    { "type": "variable", "attrs": { "id": "payload.name" } }
                ]
            }]
        }))
        .expect("valid node");

        let bound = bind_content_slot(tree);
        let children = bound.children()[0].children();
        assert_eq!(children[1].kind, kind::RAW_HTML);
        assert_eq!(children[1].text.as_deref(), Some("{{ content }}"));
        // Ordinary variables keep the escaping text path.
        assert_eq!(children[2].kind, kind::VARIABLE);
    }
}
