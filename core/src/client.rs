//! Entry point tying the components of one client together.
//!
//! # Design
//! `DreamFactoryClient` owns a single shared context (address, header state,
//! serializer, transport) and a single session manager. Clones share both,
//! so a login through one clone authenticates requests issued through any
//! other. Two clients built separately share nothing.

use std::sync::Arc;

use crate::address::EndpointAddress;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::headers::{HeaderBag, HeaderState, API_KEY_HEADER, APPLICATION_NAME_HEADER};
use crate::model::{Apps, CorsRules, EmailTemplates, EventScripts, Lookups, Roles, Services, Users};
use crate::request::Context;
use crate::resource::{Resource, ResourceClient};
use crate::serializer::{ContentSerializer, JsonContentSerializer};
use crate::session::SessionManager;
use crate::system::SystemApi;
use crate::transport::Transport;
use crate::user::UserApi;

/// Typed client for the DreamFactory administrative REST API.
#[derive(Debug, Clone)]
pub struct DreamFactoryClient {
    context: Arc<Context>,
    session: Arc<SessionManager>,
}

impl DreamFactoryClient {
    /// Build a JSON client. Fails with [`ApiError::InvalidAddress`] if the
    /// configured base URI is unusable.
    pub fn new(config: &ClientConfig, transport: impl Transport + 'static) -> Result<Self, ApiError> {
        Self::with_serializer(config, transport, JsonContentSerializer)
    }

    /// Build a client with a custom wire format.
    pub fn with_serializer(
        config: &ClientConfig,
        transport: impl Transport + 'static,
        serializer: impl ContentSerializer + 'static,
    ) -> Result<Self, ApiError> {
        let address = EndpointAddress::new(&config.base_uri, config.api_version)?;

        let mut headers = HeaderBag::new();
        if let Some(name) = &config.application_name {
            headers.set(APPLICATION_NAME_HEADER, name.clone());
        }
        if let Some(key) = &config.api_key {
            headers.set(API_KEY_HEADER, key.clone());
        }

        let context = Arc::new(Context {
            address,
            headers: HeaderState::new(headers),
            serializer: Arc::new(serializer),
            transport: Arc::new(transport),
        });
        let session = Arc::new(SessionManager::new(
            Arc::clone(&context),
            config.anonymous_session,
        ));
        tracing::debug!(base = %context.address.base(), version = %context.address.version(), "client created");

        Ok(Self { context, session })
    }

    pub fn address(&self) -> &EndpointAddress {
        &self.context.address
    }

    /// Headers sent with every request, including the session token.
    pub fn headers(&self) -> &HeaderState {
        &self.context.headers
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// CRUD client for any resource family.
    pub fn resource<R: Resource>(&self) -> ResourceClient<R> {
        ResourceClient::new(Arc::clone(&self.context))
    }

    pub fn apps(&self) -> ResourceClient<Apps> {
        self.resource()
    }

    pub fn users(&self) -> ResourceClient<Users> {
        self.resource()
    }

    pub fn roles(&self) -> ResourceClient<Roles> {
        self.resource()
    }

    pub fn services(&self) -> ResourceClient<Services> {
        self.resource()
    }

    pub fn email_templates(&self) -> ResourceClient<EmailTemplates> {
        self.resource()
    }

    pub fn cors(&self) -> ResourceClient<CorsRules> {
        self.resource()
    }

    pub fn lookups(&self) -> ResourceClient<Lookups> {
        self.resource()
    }

    pub fn event_scripts(&self) -> ResourceClient<EventScripts> {
        self.resource()
    }

    pub fn system(&self) -> SystemApi {
        SystemApi::new(Arc::clone(&self.context))
    }

    pub fn user(&self) -> UserApi {
        UserApi::new(Arc::clone(&self.context), Arc::clone(&self.session))
    }
}
