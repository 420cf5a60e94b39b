use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::application::ports::PortError;

/// Addressing context for collaborator lookups: which environment,
/// organization, and workflow creator a render belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRef {
    pub environment_id: String,
    pub organization_id: String,
    pub creator_id: String,
}

/// Layout selection carried by the step controls. The wire value is
/// three-valued: an absent field asks for the organization default, an
/// explicit `null` disables layouts for this step, and a string names one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LayoutChoice {
    #[default]
    Unset,
    Null,
    Id(String),
}

fn deserialize_layout_choice<'de, D>(deserializer: D) -> Result<LayoutChoice, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<String>::deserialize(deserializer)? {
        Some(id) => LayoutChoice::Id(id),
        None => LayoutChoice::Null,
    })
}

/// Raw step controls authored in the editor. `body` is either a
/// JSON-encoded document tree or plain text/HTML; non-string values are
/// deferred to the caller's schema validation rather than rejected here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlValues {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_layout_choice")]
    pub layout_id: LayoutChoice,
    #[serde(default)]
    pub disable_output_sanitization: bool,
}

/// Nested runtime data the template expressions resolve against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderPayload {
    #[serde(default)]
    pub subscriber: Value,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub steps: Value,
}

impl RenderPayload {
    /// The evaluator context object for this payload.
    pub fn to_context(&self) -> Value {
        serde_json::json!({
            "subscriber": self.subscriber.clone(),
            "payload": self.payload.clone(),
            "steps": self.steps.clone(),
        })
    }

    /// The context object with one additional top-level binding, used to
    /// hand rendered step content to a layout's content slot.
    pub fn context_with(&self, key: &str, value: Value) -> Value {
        let mut context = self.to_context();
        if let Some(map) = context.as_object_mut() {
            map.insert(key.to_string(), value);
        }
        context
    }
}

/// One render request: authored controls plus the runtime data they
/// resolve against.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderCommand {
    pub control_values: ControlValues,
    pub full_payload: RenderPayload,
    pub workflow: WorkflowRef,
    #[serde(default)]
    pub locale: Option<String>,
}

/// Deterministic rendering result returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderOutput {
    pub subject: String,
    pub body: String,
}

/// Structured errors surfaced by the rendering pipeline. Every variant is
/// an authoring defect or a failed collaborator lookup; best-effort stages
/// (translation, branding) log and degrade instead of appearing here.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("document processing failed: {message}")]
    Document { message: String },
    #[error("template evaluation failed: {message}")]
    Template { message: String },
    #[error("iterable `{path}` did not evaluate to a JSON array: {message}")]
    Iterable { path: String, message: String },
    #[error("substituted document failed to re-parse: {message}")]
    Reparse { message: String },
    #[error(transparent)]
    Collaborator(#[from] PortError),
}
