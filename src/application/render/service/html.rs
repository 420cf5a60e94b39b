//! Conversion of a fully resolved document tree into HTML markup.
//!
//! By the time a tree reaches this stage every conditional, loop, and
//! variable has been resolved; what remains is a pure mapping from node
//! kinds to markup. Unknown kinds render as their children.

use crate::domain::document::{DocumentNode, attr, kind};

/// Render a resolved tree. `wrap_document` controls the top-level
/// `<html>/<body>` emission; content destined for a layout's content slot
/// suppresses it.
pub fn document_to_html(root: &DocumentNode, wrap_document: bool) -> String {
    let inner = if root.kind == kind::DOC {
        render_children(root)
    } else {
        render_node(root)
    };

    if wrap_document {
        format!("<html><body>{inner}</body></html>")
    } else {
        inner
    }
}

fn render_children(node: &DocumentNode) -> String {
    node.children().iter().map(render_node).collect()
}

fn render_node(node: &DocumentNode) -> String {
    match node.kind.as_str() {
        kind::PARAGRAPH => format!("<p{}>{}</p>", style_attribute(node), render_children(node)),
        kind::HEADING => {
            let level = node.attr_u64(attr::LEVEL).unwrap_or(1).clamp(1, 6);
            format!(
                "<h{level}{}>{}</h{level}>",
                style_attribute(node),
                render_children(node)
            )
        }
        kind::TEXT => render_text(node),
        kind::SECTION => format!(
            "<div{}>{}</div>",
            style_attribute(node),
            render_children(node)
        ),
        kind::BUTTON => render_button(node),
        kind::IMAGE | kind::INLINE_IMAGE => render_image(node),
        kind::RAW_HTML => node.text.clone().unwrap_or_default(),
        _ => render_children(node),
    }
}

fn render_text(node: &DocumentNode) -> String {
    let mut html = escape_html(node.text.as_deref().unwrap_or_default());
    if let Some(marks) = &node.marks {
        for mark in marks {
            html = apply_mark(html, mark);
        }
    }
    html
}

fn apply_mark(inner: String, mark: &DocumentNode) -> String {
    match mark.kind.as_str() {
        kind::BOLD => format!("<strong>{inner}</strong>"),
        kind::ITALIC => format!("<em>{inner}</em>"),
        kind::UNDERLINE => format!("<u>{inner}</u>"),
        kind::STRIKE => format!("<s>{inner}</s>"),
        kind::CODE => format!("<code>{inner}</code>"),
        kind::LINK => {
            let href = escape_html(mark.attr_str(attr::HREF).unwrap_or_default());
            let target = escape_html(mark.attr_str(attr::TARGET).unwrap_or("_blank"));
            format!("<a href=\"{href}\" target=\"{target}\">{inner}</a>")
        }
        _ => inner,
    }
}

fn render_button(node: &DocumentNode) -> String {
    let text = escape_html(node.attr_str(attr::TEXT).unwrap_or_default());
    let url = escape_html(node.attr_str(attr::URL).unwrap_or_default());
    let alignment = escape_html(node.attr_str(attr::ALIGNMENT).unwrap_or("left"));
    format!(
        "<div style=\"text-align:{alignment}\"><a href=\"{url}\" target=\"_blank\">{text}</a></div>"
    )
}

fn render_image(node: &DocumentNode) -> String {
    let src = escape_html(node.attr_str(attr::SRC).unwrap_or_default());
    let alt = escape_html(node.attr_str(attr::ALT).unwrap_or_default());
    let image = format!("<img src=\"{src}\" alt=\"{alt}\">");

    match node.attr_str(attr::EXTERNAL_LINK) {
        Some(link) if !link.is_empty() => {
            format!("<a href=\"{}\" target=\"_blank\">{image}</a>", escape_html(link))
        }
        _ => image,
    }
}

fn style_attribute(node: &DocumentNode) -> String {
    match node.attr_str(attr::TEXT_ALIGN) {
        Some(align) if !align.is_empty() => {
            format!(" style=\"text-align:{}\"", escape_html(align))
        }
        _ => String::new(),
    }
}

/// Entity-encode text for element content and quoted attribute values. The
/// final sanitization pass enforces the markup allowlist; this only keeps
/// authored text from being parsed as markup.
fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: serde_json::Value) -> DocumentNode {
        serde_json::from_value(raw).expect("valid node")
    }

    #[test]
    fn renders_paragraphs_and_headings_with_alignment() {
        let tree = parse(json!({
            "type": "doc",
            "content": [
                { "type": "heading", "attrs": { "level": 2 }, "content": [{ "type": "text", "text": "Title" }] },
                { "type": "paragraph", "attrs": { "textAlign": "center" }, "content": [{ "type": "text", "text": "Body" }] }
            ]
        }));

        let html = document_to_html(&tree, false);
        assert_eq!(html, "<h2>Title</h2><p style=\"text-align:center\">Body</p>");
    }

    #[test]
    fn wrapping_tags_are_optional() {
        let tree = parse(json!({
            "type": "doc",
            "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "hi" }] }]
        }));

        assert_eq!(
            document_to_html(&tree, true),
            "<html><body><p>hi</p></body></html>"
        );
        assert_eq!(document_to_html(&tree, false), "<p>hi</p>");
    }

    #[test]
    fn marks_nest_around_the_text() {
        let tree = parse(json!({
            "type": "doc",
            "content": [{
                "type": "paragraph",
                "content": [{
                    "type": "text",
                    "text": "docs",
                    "marks": [
                        { "type": "bold" },
                        { "type": "link", "attrs": { "href": "https://example.com" } }
                    ]
                }]
            }]
        }));

        assert_eq!(
            document_to_html(&tree, false),
            "<p><a href=\"https://example.com\" target=\"_blank\"><strong>docs</strong></a></p>"
        );
    }

    #[test]
    fn text_content_is_entity_escaped() {
        let tree = parse(json!({
            "type": "doc",
            "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "a < b & c" }] }]
        }));

        assert_eq!(document_to_html(&tree, false), "<p>a &lt; b &amp; c</p>");
    }

    #[test]
    fn buttons_and_images_render_their_attributes() {
        let tree = parse(json!({
            "type": "doc",
            "content": [
                { "type": "button", "attrs": { "text": "Go", "url": "https://example.com", "alignment": "center" } },
                { "type": "image", "attrs": { "src": "https://img.example/a.png", "externalLink": "https://example.com" } }
            ]
        }));

        let html = document_to_html(&tree, false);
        assert!(html.contains(
            "<div style=\"text-align:center\"><a href=\"https://example.com\" target=\"_blank\">Go</a></div>"
        ));
        assert!(html.contains(
            "<a href=\"https://example.com\" target=\"_blank\"><img src=\"https://img.example/a.png\" alt=\"\"></a>"
        ));
    }

    #[test]
    fn raw_nodes_emit_their_text_verbatim() {
        let tree = parse(json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [{ "type": "text", "text": "<b>escaped</b>" }] },
                { "type": "rawHtml", "text": "<b>verbatim</b>" }
            ]
        }));

        assert_eq!(
            document_to_html(&tree, false),
            "<p>&lt;b&gt;escaped&lt;/b&gt;</p><b>verbatim</b>"
        );
    }

    #[test]
    fn unknown_kinds_render_their_children() {
        let tree = parse(json!({
            "type": "doc",
            "content": [{
                "type": "columns",
                "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "inside" }] }]
            }]
        }));

        assert_eq!(document_to_html(&tree, false), "<p>inside</p>");
    }
}
