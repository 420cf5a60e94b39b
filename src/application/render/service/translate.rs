//! Best-effort translation substitution ahead of the template passes.
//!
//! Translation never fails a render: any resolver error or re-parse failure
//! falls back to the untranslated input, and the loss is logged.

use serde_json::Value;
use tracing::warn;

use crate::application::ports::TranslationResolver;
use crate::application::render::types::WorkflowRef;
use crate::domain::document::DocumentNode;

use super::escape::reescape_control_characters;

/// Substitute translation tokens in a plain string.
pub async fn translate_text(
    resolver: &dyn TranslationResolver,
    text: &str,
    payload: &Value,
    workflow: &WorkflowRef,
    locale: Option<&str>,
) -> String {
    match resolver.substitute(text, payload, workflow, locale).await {
        Ok(translated) => translated,
        Err(error) => {
            warn!(error = %error, "translation substitution failed; using untranslated text");
            text.to_string()
        }
    }
}

/// Substitute translation tokens across a document tree through its string
/// form: stringify, substitute, re-escape control characters, parse back.
pub async fn translate_tree(
    resolver: &dyn TranslationResolver,
    tree: &DocumentNode,
    payload: &Value,
    workflow: &WorkflowRef,
    locale: Option<&str>,
) -> DocumentNode {
    let serialized = match serde_json::to_string(tree) {
        Ok(serialized) => serialized,
        Err(error) => {
            warn!(error = %error, "document could not be serialized for translation; using untranslated tree");
            return tree.clone();
        }
    };

    let substituted = match resolver
        .substitute(&serialized, payload, workflow, locale)
        .await
    {
        Ok(substituted) => substituted,
        Err(error) => {
            warn!(error = %error, "translation substitution failed; using untranslated tree");
            return tree.clone();
        }
    };

    let reescaped = reescape_control_characters(&substituted);
    match serde_json::from_str(&reescaped) {
        Ok(translated) => translated,
        Err(error) => {
            warn!(error = %error, "translated document failed to re-parse; using untranslated tree");
            tree.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{PassthroughTranslations, PortError};
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingTranslations;

    #[async_trait]
    impl TranslationResolver for FailingTranslations {
        async fn substitute(
            &self,
            _text: &str,
            _payload: &Value,
            _workflow: &WorkflowRef,
            _locale: Option<&str>,
        ) -> Result<String, PortError> {
            Err(PortError::lookup("translation backend unreachable"))
        }
    }

    struct CorruptingTranslations;

    #[async_trait]
    impl TranslationResolver for CorruptingTranslations {
        async fn substitute(
            &self,
            _text: &str,
            _payload: &Value,
            _workflow: &WorkflowRef,
            _locale: Option<&str>,
        ) -> Result<String, PortError> {
            Ok("not json".to_string())
        }
    }

    struct UpcasingTranslations;

    #[async_trait]
    impl TranslationResolver for UpcasingTranslations {
        async fn substitute(
            &self,
            text: &str,
            _payload: &Value,
            _workflow: &WorkflowRef,
            _locale: Option<&str>,
        ) -> Result<String, PortError> {
            Ok(text.replace("{t.greeting}", "Bonjour"))
        }
    }

    fn workflow() -> WorkflowRef {
        WorkflowRef {
            environment_id: "env".into(),
            organization_id: "org".into(),
            creator_id: "creator".into(),
        }
    }

    fn tree() -> DocumentNode {
        serde_json::from_value(json!({
            "type": "doc",
            "content": [{ "type": "text", "text": "{t.greeting} {{ payload.name }}" }]
        }))
        .expect("valid node")
    }

    #[tokio::test]
    async fn substitutes_tokens_through_the_tree_string_form() {
        let translated = translate_tree(
            &UpcasingTranslations,
            &tree(),
            &json!({}),
            &workflow(),
            Some("fr_FR"),
        )
        .await;
        assert_eq!(
            translated.children()[0].text.as_deref(),
            Some("Bonjour {{ payload.name }}")
        );
    }

    #[tokio::test]
    async fn resolver_failure_falls_back_to_the_original_tree() {
        let original = tree();
        let translated = translate_tree(
            &FailingTranslations,
            &original,
            &json!({}),
            &workflow(),
            None,
        )
        .await;
        assert_eq!(translated, original);
    }

    #[tokio::test]
    async fn unparsable_substitution_falls_back_to_the_original_tree() {
        let original = tree();
        let translated = translate_tree(
            &CorruptingTranslations,
            &original,
            &json!({}),
            &workflow(),
            None,
        )
        .await;
        assert_eq!(translated, original);
    }

    #[tokio::test]
    async fn plain_text_failure_falls_back_to_the_original_text() {
        let translated = translate_text(
            &FailingTranslations,
            "subject {t.key}",
            &json!({}),
            &workflow(),
            None,
        )
        .await;
        assert_eq!(translated, "subject {t.key}");
    }

    #[tokio::test]
    async fn passthrough_resolver_is_an_identity() {
        let translated = translate_text(
            &PassthroughTranslations,
            "unchanged",
            &json!({}),
            &workflow(),
            None,
        )
        .await;
        assert_eq!(translated, "unchanged");
    }
}
