//! System-level operations that do not fit the CRUD engine: the singleton
//! configuration and application package downloads.

use std::sync::Arc;

use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::model::{Apps, SystemConfig};
use crate::request::{decode_bytes, decode_one, Context, PendingRequest};
use crate::resource::Resource;

const CONFIG_PATH: &str = "system/config";

/// Administrative helpers under `system/`.
#[derive(Debug, Clone)]
pub struct SystemApi {
    context: Arc<Context>,
}

impl SystemApi {
    pub(crate) fn new(context: Arc<Context>) -> Self {
        Self { context }
    }

    pub fn build_get_config(&self) -> PendingRequest<SystemConfig> {
        let url = self.context.address.resolve(CONFIG_PATH, &[]);
        let request = self.context.http_request(HttpMethod::Get, url, None);
        PendingRequest::new(Arc::clone(&self.context), request, decode_one::<SystemConfig>)
    }

    /// PATCH the fields set in `config`; the service returns the result.
    pub fn build_update_config(&self, config: &SystemConfig) -> Result<PendingRequest<SystemConfig>, ApiError> {
        if *config == SystemConfig::default() {
            return Err(ApiError::invalid_argument("config update has no fields set"));
        }
        let body = self.context.encode(config)?;
        let url = self.context.address.resolve(CONFIG_PATH, &[]);
        let request = self.context.http_request(HttpMethod::Patch, url, Some(body));
        Ok(PendingRequest::new(
            Arc::clone(&self.context),
            request,
            decode_one::<SystemConfig>,
        ))
    }

    /// GET `system/app/{id}?pkg=true`: the application as an import package.
    pub fn build_download_application_package(&self, app_id: i64) -> PendingRequest<Vec<u8>> {
        self.app_download(app_id, "pkg")
    }

    /// GET `system/app/{id}?sdk=true`: the client SDK bundle for the app.
    pub fn build_download_application_sdk(&self, app_id: i64) -> PendingRequest<Vec<u8>> {
        self.app_download(app_id, "sdk")
    }

    pub async fn get_config(&self) -> Result<SystemConfig, ApiError> {
        self.build_get_config().send().await
    }

    pub async fn update_config(&self, config: &SystemConfig) -> Result<SystemConfig, ApiError> {
        self.build_update_config(config)?.send().await
    }

    pub async fn download_application_package(&self, app_id: i64) -> Result<Vec<u8>, ApiError> {
        self.build_download_application_package(app_id).send().await
    }

    pub async fn download_application_sdk(&self, app_id: i64) -> Result<Vec<u8>, ApiError> {
        self.build_download_application_sdk(app_id).send().await
    }

    fn app_download(&self, app_id: i64, flag: &'static str) -> PendingRequest<Vec<u8>> {
        let id = app_id.to_string();
        let url = self
            .context
            .address
            .resolve_with_query(Apps::PATH, &[&id], &[(flag, "true".to_string())]);
        let mut request = self.context.http_request(HttpMethod::Get, url, None);
        request
            .headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("accept"));
        request
            .headers
            .insert(0, ("Accept".to_string(), "application/octet-stream".to_string()));
        PendingRequest::new(Arc::clone(&self.context), request, decode_bytes)
    }
}
