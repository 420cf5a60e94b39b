//! Template evaluation: the embedded expression language and the
//! whole-tree substitution pass.

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde_json::Value;

use crate::application::render::types::RenderError;
use crate::domain::document::DocumentNode;

use super::escape::reescape_control_characters;

/// Stateless evaluator for `{{ path | filters }}` expressions. One instance
/// is shared across renders; evaluation is a pure function of the template
/// string and context.
pub struct TemplateEvaluator {
    env: Environment<'static>,
}

impl TemplateEvaluator {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Missing payload paths render as empty strings instead of erroring,
        // and substituted values land in the output verbatim; safety is the
        // sanitizer's job.
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        Self { env }
    }

    /// Substitute every expression in `template` against `context`.
    pub fn render(&self, template: &str, context: &Value) -> Result<String, RenderError> {
        self.env
            .render_str(template, context)
            .map_err(|err| RenderError::Template {
                message: err.to_string(),
            })
    }
}

impl Default for TemplateEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a structurally resolved tree, substitute it in one pass, and
/// parse the result back. A failed re-parse means the authored document or
/// payload is structurally wrong; there is no fallback on this path.
pub fn apply_template_pass(
    evaluator: &TemplateEvaluator,
    tree: &DocumentNode,
    context: &Value,
) -> Result<DocumentNode, RenderError> {
    let serialized = serde_json::to_string(tree).map_err(|err| RenderError::Document {
        message: err.to_string(),
    })?;
    let substituted = evaluator.render(&serialized, context)?;
    let reescaped = reescape_control_characters(&substituted);
    serde_json::from_str(&reescaped).map_err(|err| RenderError::Reparse {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::service::escape::escape_payload;
    use serde_json::json;

    fn parse(raw: serde_json::Value) -> DocumentNode {
        serde_json::from_value(raw).expect("valid node")
    }

    #[test]
    fn substitutes_expressions_in_plain_strings() {
        let evaluator = TemplateEvaluator::new();
        let rendered = evaluator
            .render("Hello {{payload.name}}!", &json!({ "payload": { "name": "John" } }))
            .unwrap();
        assert_eq!(rendered, "Hello John!");
    }

    #[test]
    fn missing_paths_render_as_empty_strings() {
        let evaluator = TemplateEvaluator::new();
        let rendered = evaluator
            .render("[{{ payload.missing.deeply }}]", &json!({ "payload": {} }))
            .unwrap();
        assert_eq!(rendered, "[]");
    }

    #[test]
    fn default_filter_covers_missing_values() {
        let evaluator = TemplateEvaluator::new();
        let rendered = evaluator
            .render("{{ payload.nickname | default('friend') }}", &json!({ "payload": {} }))
            .unwrap();
        assert_eq!(rendered, "friend");
    }

    #[test]
    fn template_pass_substitutes_across_the_serialized_tree() {
        let evaluator = TemplateEvaluator::new();
        let tree = parse(json!({
            "type": "doc",
            "content": [{
                "type": "paragraph",
                "content": [{ "type": "text", "text": "Hello {{ payload.name }}" }]
            }]
        }));

        let resolved = apply_template_pass(
            &evaluator,
            &tree,
            &escape_payload(&json!({ "payload": { "name": "John" } })),
        )
        .unwrap();

        assert_eq!(
            resolved.children()[0].children()[0].text.as_deref(),
            Some("Hello John")
        );
    }

    #[test]
    fn payload_quotes_and_newlines_survive_the_round_trip() {
        let evaluator = TemplateEvaluator::new();
        let tree = parse(json!({
            "type": "doc",
            "content": [{ "type": "text", "text": "{{ payload.quote }}" }]
        }));

        let resolved = apply_template_pass(
            &evaluator,
            &tree,
            &escape_payload(&json!({ "payload": { "quote": "she said \"hi\"\nthen left" } })),
        )
        .unwrap();

        assert_eq!(
            resolved.children()[0].text.as_deref(),
            Some("she said \"hi\"\nthen left")
        );
    }
}
