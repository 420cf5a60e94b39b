//! Message rendering pipeline.
//!
//! One render call is a sequential pipeline: translate the subject, pick
//! the body path (document tree, plain text, or passthrough), optionally
//! compose the rendered step into an organization layout, then brand,
//! normalize, and sanitize the result. Collaborator lookups are the only
//! suspension points; everything else is pure.

mod escape;
mod expression;
mod html;
mod layout;
mod postprocess;
mod sanitize;
mod template;
mod transform;
mod translate;
mod truthy;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::application::ports::{
    LayoutControlsStore, LayoutResolver, OrganizationSettingsAccessor, TranslationResolver,
};
use crate::application::render::types::{RenderCommand, RenderError, RenderOutput};
use crate::domain::document::DocumentNode;

pub use postprocess::BRANDING_HTML;

/// Switches for optional pipeline stages.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub layouts_enabled: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            layouts_enabled: true,
        }
    }
}

/// Renders one notification step's controls into a subject and body.
///
/// The renderer holds no per-call state: the evaluator is a pure function
/// over (template, context) pairs and the sanitizer is reused read-only, so
/// one instance serves concurrent renders.
pub struct MessageOutputRenderer {
    evaluator: template::TemplateEvaluator,
    sanitizer: ammonia::Builder<'static>,
    layouts: Arc<dyn LayoutResolver>,
    layout_controls: Arc<dyn LayoutControlsStore>,
    organization_settings: Arc<dyn OrganizationSettingsAccessor>,
    translations: Arc<dyn TranslationResolver>,
    config: RendererConfig,
}

impl MessageOutputRenderer {
    pub fn new(
        layouts: Arc<dyn LayoutResolver>,
        layout_controls: Arc<dyn LayoutControlsStore>,
        organization_settings: Arc<dyn OrganizationSettingsAccessor>,
        translations: Arc<dyn TranslationResolver>,
        config: RendererConfig,
    ) -> Self {
        Self {
            evaluator: template::TemplateEvaluator::new(),
            sanitizer: sanitize::build_output_sanitizer(),
            layouts,
            layout_controls,
            organization_settings,
            translations,
            config,
        }
    }

    /// Render the step controls against the runtime payload.
    ///
    /// A missing or non-string body is passed through unchanged with the
    /// subject unrendered; schema validation belongs to the invoking layer.
    pub async fn render_output(&self, command: RenderCommand) -> Result<RenderOutput, RenderError> {
        let subject_source = command.control_values.subject.clone().unwrap_or_default();

        let Some(body_value) = command.control_values.body.clone() else {
            return Ok(RenderOutput {
                subject: subject_source,
                body: String::new(),
            });
        };
        let body = match body_value {
            Value::String(body) => body,
            other => {
                let body = serde_json::to_string(&other).map_err(|err| RenderError::Document {
                    message: err.to_string(),
                })?;
                return Ok(RenderOutput {
                    subject: subject_source,
                    body,
                });
            }
        };

        let raw_context = command.full_payload.to_context();
        let subject = self.render_subject(&subject_source, &command, &raw_context).await?;

        let rendered = if self.config.layouts_enabled {
            self.render_body_with_layout(&body, &command, &raw_context)
                .await?
        } else {
            self.render_step_body(&body, &command, &raw_context, true)
                .await?
        };

        let branded = self
            .append_branding(rendered, &command.workflow.organization_id)
            .await;
        let normalized = postprocess::normalize_whitespace_paragraphs(&branded);

        if command.control_values.disable_output_sanitization {
            return Ok(RenderOutput {
                subject,
                body: normalized,
            });
        }
        Ok(RenderOutput {
            subject: self.sanitizer.clean(&subject).to_string(),
            body: self.sanitizer.clean(&normalized).to_string(),
        })
    }

    async fn render_subject(
        &self,
        subject: &str,
        command: &RenderCommand,
        raw_context: &Value,
    ) -> Result<String, RenderError> {
        let translated = translate::translate_text(
            self.translations.as_ref(),
            subject,
            raw_context,
            &command.workflow,
            command.locale.as_deref(),
        )
        .await;
        self.evaluator.render(&translated, raw_context)
    }

    /// Render a step body directly: a string that parses as a document tree
    /// takes the document path, anything else the plain-text path.
    async fn render_step_body(
        &self,
        body: &str,
        command: &RenderCommand,
        context: &Value,
        wrap_document: bool,
    ) -> Result<String, RenderError> {
        match serde_json::from_str::<DocumentNode>(body) {
            Ok(tree) => {
                self.render_document(tree, command, context, wrap_document)
                    .await
            }
            Err(_) => self.render_plain(body, command, context).await,
        }
    }

    async fn render_document(
        &self,
        tree: DocumentNode,
        command: &RenderCommand,
        context: &Value,
        wrap_document: bool,
    ) -> Result<String, RenderError> {
        let wrapped = expression::wrap_expressions(&tree);
        let translated = translate::translate_tree(
            self.translations.as_ref(),
            &wrapped,
            context,
            &command.workflow,
            command.locale.as_deref(),
        )
        .await;

        let escaped_context = escape::escape_payload(context);
        let mut working = translated;
        transform::transform_tree(&mut working, &self.evaluator, &escaped_context)?;
        let mut resolved =
            template::apply_template_pass(&self.evaluator, &working, &escaped_context)?;
        postprocess::remove_trailing_empty_paragraphs(&mut resolved);

        Ok(html::document_to_html(&resolved, wrap_document))
    }

    async fn render_plain(
        &self,
        body: &str,
        command: &RenderCommand,
        context: &Value,
    ) -> Result<String, RenderError> {
        let translated = translate::translate_text(
            self.translations.as_ref(),
            body,
            context,
            &command.workflow,
            command.locale.as_deref(),
        )
        .await;

        if translated != body {
            match self.evaluator.render(&translated, context) {
                Ok(rendered) => return Ok(rendered),
                Err(error) => {
                    warn!(error = %error, "translated body failed template evaluation; evaluating untranslated body");
                }
            }
        }
        self.evaluator.render(body, context)
    }

    async fn render_body_with_layout(
        &self,
        body: &str,
        command: &RenderCommand,
        raw_context: &Value,
    ) -> Result<String, RenderError> {
        let controls = layout::resolve_layout_controls(
            self.layouts.as_ref(),
            self.layout_controls.as_ref(),
            &command.control_values.layout_id,
            &command.workflow,
        )
        .await?;

        let Some(controls) = controls else {
            return self.render_step_body(body, command, raw_context, true).await;
        };
        let Some(layout_body) = controls.email_body else {
            debug!("layout defines no content for this channel; rendering an empty body");
            return Ok(String::new());
        };

        let step_html = self
            .render_step_body(body, command, raw_context, false)
            .await?;
        let cleaned = layout::clean_step_html(&step_html);
        let layout_context = command
            .full_payload
            .context_with(layout::CONTENT_SLOT_KEY, Value::String(cleaned));

        match serde_json::from_str::<DocumentNode>(&layout_body) {
            Ok(tree) => {
                let tree = layout::bind_content_slot(tree);
                self.render_document(tree, command, &layout_context, true)
                    .await
            }
            Err(_) => self.render_plain(&layout_body, command, &layout_context).await,
        }
    }

    /// Branding is best-effort: a failed settings lookup leaves the output
    /// unbranded rather than failing the render.
    async fn append_branding(&self, html: String, organization_id: &str) -> String {
        match self.organization_settings.get(organization_id).await {
            Ok(settings) if settings.branding_removed => html,
            Ok(_) => postprocess::insert_branding_html(&html),
            Err(error) => {
                debug!(error = %error, "organization settings lookup failed; leaving output unbranded");
                html
            }
        }
    }
}
