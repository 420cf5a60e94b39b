//! Final-HTML adjustments: branding insertion and whitespace-clipping
//! mitigation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::document::{DocumentNode, kind};

/// Fixed branding fragment appended to rendered messages unless the
/// organization has branding removed.
pub const BRANDING_HTML: &str = "<table data-branding=\"missive\" role=\"presentation\" width=\"100%\" style=\"margin-top:24px\"><tr><td align=\"center\" style=\"font-size:12px;color:#8898aa\">Sent with <a href=\"https://missive.dev\" target=\"_blank\" style=\"color:#8898aa\">Missive</a></td></tr></table>";

static BODY_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</body>").expect("body-close pattern compiles"));

static WHITESPACE_PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<p([^>]*)>\s+</p>").expect("whitespace-paragraph pattern compiles"));

/// Insert the branding fragment before the last `</body>`, or append it to
/// non-empty content that has no body tag. Empty content stays empty.
pub fn insert_branding_html(html: &str) -> String {
    match BODY_CLOSE_RE.find_iter(html).last() {
        Some(found) => format!(
            "{}{}{}",
            &html[..found.start()],
            BRANDING_HTML,
            &html[found.start()..]
        ),
        None if !html.trim().is_empty() => format!("{html}{BRANDING_HTML}"),
        None => html.to_string(),
    }
}

/// Rewrite paragraphs whose only content is whitespace into empty
/// paragraphs, attributes preserved. Some mail clients truncate messages
/// that end in trailing-whitespace blocks.
pub fn normalize_whitespace_paragraphs(html: &str) -> String {
    WHITESPACE_PARAGRAPH_RE
        .replace_all(html, "<p$1></p>")
        .into_owned()
}

/// Drop the trailing run of empty paragraphs from the root's content.
pub fn remove_trailing_empty_paragraphs(root: &mut DocumentNode) {
    let Some(content) = root.content.as_mut() else {
        return;
    };

    let mut keep = content.len();
    for (index, child) in content.iter().enumerate().rev() {
        let empty_paragraph = child.kind == kind::PARAGRAPH
            && child.text.as_deref().unwrap_or_default().is_empty()
            && child.content.as_ref().is_none_or(|children| children.is_empty());
        if !empty_paragraph {
            keep = index + 1;
            break;
        }
    }
    content.truncate(keep);
}
