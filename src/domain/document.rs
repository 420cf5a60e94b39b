//! Document tree model shared by every rendering stage.
//!
//! The tree mirrors the editor's wire shape: a `type` discriminator, a raw
//! attribute map, ordered children, and inline marks. Node kinds the
//! renderer does not understand keep their attributes verbatim through the
//! serialize → substitute → re-parse passes and render as their children.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node and mark kinds understood by the renderer.
pub mod kind {
    pub const DOC: &str = "doc";
    pub const PARAGRAPH: &str = "paragraph";
    pub const HEADING: &str = "heading";
    pub const TEXT: &str = "text";
    pub const VARIABLE: &str = "variable";
    pub const SECTION: &str = "section";
    pub const REPEAT: &str = "repeat";
    pub const BUTTON: &str = "button";
    pub const IMAGE: &str = "image";
    pub const INLINE_IMAGE: &str = "inlineImage";
    /// Synthesized by the layout composer for content-slot injection;
    /// never present in authored documents.
    pub const RAW_HTML: &str = "rawHtml";

    pub const LINK: &str = "link";
    pub const BOLD: &str = "bold";
    pub const ITALIC: &str = "italic";
    pub const UNDERLINE: &str = "underline";
    pub const STRIKE: &str = "strike";
    pub const CODE: &str = "code";
}

/// Attribute names carried by the node kinds above.
pub mod attr {
    pub const ID: &str = "id";
    pub const FALLBACK: &str = "fallback";
    pub const ALIAS_FOR: &str = "aliasFor";
    pub const SHOW_IF_KEY: &str = "showIfKey";
    pub const EACH_KEY: &str = "each";
    pub const ITERATIONS_KEY: &str = "iterations";
    pub const TEXT: &str = "text";
    pub const URL: &str = "url";
    pub const SRC: &str = "src";
    pub const EXTERNAL_LINK: &str = "externalLink";
    pub const HREF: &str = "href";
    pub const TARGET: &str = "target";
    pub const ALT: &str = "alt";
    pub const LEVEL: &str = "level";
    pub const TEXT_ALIGN: &str = "textAlign";
    pub const ALIGNMENT: &str = "alignment";
    pub const IS_TEXT_VARIABLE: &str = "isTextVariable";
    pub const IS_URL_VARIABLE: &str = "isUrlVariable";
    pub const IS_SRC_VARIABLE: &str = "isSrcVariable";
    pub const IS_EXTERNAL_LINK_VARIABLE: &str = "isExternalLinkVariable";
}

/// One node of an authored document. Marks share the node shape so loop
/// expansion can rewrite them with the same machinery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<DocumentNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<DocumentNode>>,
}

impl DocumentNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.as_ref()?.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name)?.as_str()
    }

    pub fn attr_u64(&self, name: &str) -> Option<u64> {
        self.attr(name)?.as_u64()
    }

    pub fn set_attr(&mut self, name: &str, value: Value) {
        self.attrs
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), value);
    }

    pub fn remove_attr(&mut self, name: &str) {
        if let Some(attrs) = self.attrs.as_mut() {
            attrs.remove(name);
        }
    }

    /// Whether this node carries an unresolved conditional.
    pub fn has_show_condition(&self) -> bool {
        self.attr(attr::SHOW_IF_KEY).is_some()
    }

    /// Whether this node is a loop awaiting expansion.
    pub fn is_repeat(&self) -> bool {
        self.kind == kind::REPEAT && self.attr(attr::EACH_KEY).is_some()
    }

    pub fn children(&self) -> &[DocumentNode] {
        self.content.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_unknown_kinds_and_attributes() {
        let raw = json!({
            "type": "spacer",
            "attrs": { "height": "lg", "showIfKey": "payload.flag" },
            "content": [{ "type": "text", "text": "hi" }]
        })
        .to_string();

        let node: DocumentNode = serde_json::from_str(&raw).expect("parses");
        assert_eq!(node.kind, "spacer");
        assert!(node.has_show_condition());
        assert_eq!(node.children().len(), 1);

        let reserialized = serde_json::to_string(&node).expect("serializes");
        let reparsed: DocumentNode = serde_json::from_str(&reserialized).expect("re-parses");
        assert_eq!(node, reparsed);
    }

    #[test]
    fn repeat_detection_requires_the_iterable_attribute() {
        let mut node = DocumentNode::new(kind::REPEAT);
        assert!(!node.is_repeat());
        node.set_attr(attr::EACH_KEY, json!("{{ payload.items }}"));
        assert!(node.is_repeat());
    }
}
