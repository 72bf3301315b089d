use serde::{Deserialize, Serialize};

use super::{Apps, AuditInfo};
use crate::error::ApiError;
use crate::request::PendingRequest;
use crate::resource::ResourceClient;

/// Application record to create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_url_external: Option<bool>,
    /// Package to import the application from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_service_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_container: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_fullscreen: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_fullscreen_toggle: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_plugin: Option<bool>,
}

impl AppRequest {
    pub fn new(name: impl Into<String>, api_name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            api_name: Some(api_name.into()),
            ..Self::default()
        }
    }
}

/// Application record as stored by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppResponse {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub api_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_url_external: Option<bool>,
    #[serde(default)]
    pub import_url: Option<String>,
    #[serde(default)]
    pub storage_service_id: Option<String>,
    #[serde(default)]
    pub storage_container: Option<String>,
    #[serde(default)]
    pub requires_fullscreen: Option<bool>,
    #[serde(default)]
    pub allow_fullscreen_toggle: Option<bool>,
    #[serde(default)]
    pub toggle_location: Option<String>,
    #[serde(default)]
    pub requires_plugin: Option<bool>,
    #[serde(flatten)]
    pub audit: AuditInfo,
}

impl ResourceClient<Apps> {
    /// Like [`build_delete`](ResourceClient::build_delete). With
    /// `delete_storage` the service also removes the files each app was
    /// hosted from.
    pub fn build_delete_with_storage(
        &self,
        ids: &[i64],
        delete_storage: bool,
    ) -> Result<PendingRequest<Vec<AppResponse>>, ApiError> {
        self.build_delete_with(ids, &[("delete_storage", delete_storage.to_string())])
    }

    pub async fn delete_with_storage(
        &self,
        ids: &[i64],
        delete_storage: bool,
    ) -> Result<Vec<AppResponse>, ApiError> {
        self.build_delete_with_storage(ids, delete_storage)?.send().await
    }
}
