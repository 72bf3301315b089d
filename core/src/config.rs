//! Client configuration.
//!
//! # Design
//! `ClientConfig` is plain data: it can be built in code, deserialized from
//! whatever file format the host application uses, or read from
//! `DREAMFACTORY_*` environment variables. Validation of the base URI
//! happens when a client is built from it, not here.

use serde::{Deserialize, Serialize};

use crate::address::ApiVersion;
use crate::error::ApiError;

pub const ENV_BASE_URI: &str = "DREAMFACTORY_BASE_URI";
pub const ENV_API_VERSION: &str = "DREAMFACTORY_API_VERSION";
pub const ENV_APPLICATION_NAME: &str = "DREAMFACTORY_APPLICATION_NAME";
pub const ENV_API_KEY: &str = "DREAMFACTORY_API_KEY";

/// What [`SessionManager::current_session`] does while anonymous.
///
/// [`SessionManager::current_session`]: crate::session::SessionManager::current_session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnonymousSessionPolicy {
    /// Fail with [`ApiError::NotAuthenticated`] without a network call.
    #[default]
    Fail,
    /// Ask the service for the current session and adopt it if one exists.
    Refresh,
}

/// Settings needed to build a [`DreamFactoryClient`](crate::DreamFactoryClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Absolute `http(s)` URI of the service, without the `api/{version}` suffix.
    pub base_uri: String,
    #[serde(default)]
    pub api_version: ApiVersion,
    /// Sent as `X-DreamFactory-Application-Name` on every request.
    #[serde(default)]
    pub application_name: Option<String>,
    /// Sent as `X-DreamFactory-Api-Key` on every request.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub anonymous_session: AnonymousSessionPolicy,
}

impl ClientConfig {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            api_version: ApiVersion::default(),
            application_name: None,
            api_key: None,
            anonymous_session: AnonymousSessionPolicy::default(),
        }
    }

    pub fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = version;
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn anonymous_session(mut self, policy: AnonymousSessionPolicy) -> Self {
        self.anonymous_session = policy;
        self
    }

    /// Read the configuration from `DREAMFACTORY_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_uri = non_empty(ENV_BASE_URI)
            .ok_or_else(|| ApiError::invalid_argument(format!("{ENV_BASE_URI} is not set")))?;
        let mut config = Self::new(base_uri);

        if let Some(version) = non_empty(ENV_API_VERSION) {
            config.api_version = version.trim().parse().map_err(|_| {
                ApiError::invalid_argument(format!("{ENV_API_VERSION} has unknown version '{version}'"))
            })?;
        }
        config.application_name = non_empty(ENV_APPLICATION_NAME);
        config.api_key = non_empty(ENV_API_KEY);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_all_variables() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URI, "https://df.example.com"),
            (ENV_API_VERSION, "V1"),
            (ENV_APPLICATION_NAME, "admin"),
            (ENV_API_KEY, "key"),
        ]))
        .unwrap();

        assert_eq!(config.base_uri, "https://df.example.com");
        assert_eq!(config.api_version, ApiVersion::V1);
        assert_eq!(config.application_name.as_deref(), Some("admin"));
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.anonymous_session, AnonymousSessionPolicy::Fail);
    }

    #[test]
    fn missing_base_uri_is_an_error() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_API_KEY, "key")])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(ref m) if m.contains(ENV_BASE_URI)));
    }

    #[test]
    fn unknown_version_is_an_error() {
        let err = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URI, "http://localhost"),
            (ENV_API_VERSION, "v9"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_uri":"http://localhost","anonymous_session":"refresh"}"#).unwrap();
        assert_eq!(config.api_version, ApiVersion::V2);
        assert_eq!(config.anonymous_session, AnonymousSessionPolicy::Refresh);
        assert!(config.api_key.is_none());
    }
}
