use serde::{Deserialize, Serialize};

use super::AuditInfo;

/// Script attached to a service event. The event name is the identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventScriptRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Script engine, e.g. `v8js` or `php`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub script_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_event_modification: Option<bool>,
}

impl EventScriptRequest {
    pub fn new(name: impl Into<String>, script_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            script_type: Some(script_type.into()),
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventScriptResponse {
    pub name: String,
    #[serde(rename = "type", default)]
    pub script_type: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub allow_event_modification: Option<bool>,
    #[serde(flatten)]
    pub audit: AuditInfo,
}
