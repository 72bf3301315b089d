//! Typed async client for the DreamFactory administrative REST API.
//!
//! # Overview
//! Builds requests for the service's resource families (apps, users, roles,
//! services, email templates, CORS rules, lookups, event scripts, system
//! config), tracks the authenticated session, and maps responses to typed
//! results or typed [`ApiError`]s. Network I/O is delegated to a
//! caller-supplied [`Transport`].
//!
//! # Design
//! - One generic [`ResourceClient`] implements list/get/create/update/delete
//!   for every family; families are [`Resource`] descriptors in [`model`].
//! - Each operation has a synchronous `build_*` step (validation, URL,
//!   header snapshot, body) and an async step that sends and decodes. Bad
//!   input never reaches the transport.
//! - Shared state is limited to one [`HeaderState`] per client, written to by
//!   the [`SessionManager`] only for the session token.

pub mod address;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod model;
pub mod query;
pub mod request;
pub mod resource;
pub mod serializer;
pub mod session;
pub mod system;
pub mod transport;
pub mod user;

pub use address::{ApiVersion, EndpointAddress};
pub use client::DreamFactoryClient;
pub use config::{AnonymousSessionPolicy, ClientConfig};
pub use error::{ApiError, TransportError};
pub use headers::{HeaderBag, HeaderState, SESSION_TOKEN_HEADER};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::SqlQuery;
pub use request::PendingRequest;
pub use resource::{Capabilities, Resource, ResourceClient, ResourceId};
pub use serializer::{ContentSerializer, JsonContentSerializer};
pub use session::{SessionManager, SessionState, SessionStatus};
pub use system::SystemApi;
pub use transport::Transport;
pub use user::UserApi;
