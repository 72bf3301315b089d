use serde::{Deserialize, Serialize};

use super::AuditInfo;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Allowed verbs, e.g. `["GET", "POST"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsResponse {
    pub id: i64,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub method: Option<Vec<String>>,
    #[serde(default)]
    pub max_age: Option<i64>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub audit: AuditInfo,
}
