//! Collaborator traits describing the renderer's external lookups.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::application::render::WorkflowRef;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("collaborator lookup failed: {0}")]
    Lookup(String),
}

impl PortError {
    pub fn lookup(err: impl std::fmt::Display) -> Self {
        Self::Lookup(err.to_string())
    }
}

/// Identity of a layout applicable to a workflow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutIdentity {
    pub layout_id: String,
    pub is_default: bool,
}

/// Persistence level of a control-values document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlLevel {
    LayoutControls,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutControlsQuery {
    pub organization_id: String,
    pub environment_id: String,
    pub layout_id: String,
    pub level: ControlLevel,
}

/// Persisted body for one layout on this channel: either a JSON document
/// tree or plain HTML. `None` means the layout defines no content here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutControls {
    pub email_body: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrganizationSettings {
    pub branding_removed: bool,
}

/// Resolves which layout applies to a step: the explicitly named one, or
/// the organization/environment default when `explicit_id` is `None`.
#[async_trait]
pub trait LayoutResolver: Send + Sync {
    async fn resolve(
        &self,
        explicit_id: Option<&str>,
        workflow: &WorkflowRef,
    ) -> Result<Option<LayoutIdentity>, PortError>;
}

/// Looks up the persisted control values of a resolved layout.
#[async_trait]
pub trait LayoutControlsStore: Send + Sync {
    async fn find(&self, query: &LayoutControlsQuery)
    -> Result<Option<LayoutControls>, PortError>;
}

/// Reads organization-level presentation settings.
#[async_trait]
pub trait OrganizationSettingsAccessor: Send + Sync {
    async fn get(&self, organization_id: &str) -> Result<OrganizationSettings, PortError>;
}

/// Substitutes translation tokens in a string (plain text or a serialized
/// document tree) for the subscriber's locale.
#[async_trait]
pub trait TranslationResolver: Send + Sync {
    async fn substitute(
        &self,
        text: &str,
        payload: &Value,
        workflow: &WorkflowRef,
        locale: Option<&str>,
    ) -> Result<String, PortError>;
}

/// Identity substitution for deployments without a translation backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranslations;

#[async_trait]
impl TranslationResolver for PassthroughTranslations {
    async fn substitute(
        &self,
        text: &str,
        _payload: &Value,
        _workflow: &WorkflowRef,
        _locale: Option<&str>,
    ) -> Result<String, PortError> {
        Ok(text.to_string())
    }
}
