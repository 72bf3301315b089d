//! Shared request plumbing: the per-client context and deferred requests.
//!
//! # Design
//! Every operation goes through two steps. A synchronous build step
//! validates arguments, resolves the URL, encodes the body and snapshots the
//! header state into a [`PendingRequest`]. The async [`PendingRequest::send`]
//! then hands that request to the transport and runs the decoder chosen at
//! build time. Nothing that can fail on bad input happens after the first
//! `.await`.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, Span};
use url::Url;

use crate::address::EndpointAddress;
use crate::error::{preview, ApiError};
use crate::headers::{HeaderBag, HeaderState};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::serializer::ContentSerializer;
use crate::transport::Transport;

/// Everything a request needs, shared by all APIs of one client.
pub(crate) struct Context {
    pub(crate) address: EndpointAddress,
    pub(crate) headers: HeaderState,
    pub(crate) serializer: Arc<dyn ContentSerializer>,
    pub(crate) transport: Arc<dyn Transport>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("address", &self.address)
            .field("serializer", &self.serializer)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Assemble a request with a header snapshot taken now.
    ///
    /// `Accept` (and `Content-Type` when there is a body) default to the
    /// serializer's content type; headers from the shared state win.
    pub(crate) fn http_request(&self, method: HttpMethod, url: Url, body: Option<Vec<u8>>) -> HttpRequest {
        let content_type = self.serializer.content_type();
        let mut bag = HeaderBag::new();
        bag.set("Accept", content_type);
        if body.is_some() {
            bag.set("Content-Type", content_type);
        }
        for (name, value) in self.headers.snapshot() {
            bag.set(&name, value);
        }
        HttpRequest {
            method,
            url: url.into(),
            headers: bag.snapshot(),
            body,
        }
    }

    pub(crate) fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, ApiError> {
        self.serializer.encode(value)
    }
}

type Decoder<T> = Box<dyn FnOnce(&dyn ContentSerializer, HttpResponse) -> Result<T, ApiError> + Send>;

/// A fully built request waiting to be sent.
///
/// Produced by the `build_*` methods. Inspect it with
/// [`request`](Self::request) or dispatch it with [`send`](Self::send).
#[must_use = "a pending request does nothing until sent"]
pub struct PendingRequest<T> {
    context: Arc<Context>,
    request: HttpRequest,
    decoder: Decoder<T>,
}

impl<T> fmt::Debug for PendingRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("method", &self.request.method)
            .field("url", &self.request.url)
            .finish_non_exhaustive()
    }
}

impl<T> PendingRequest<T> {
    pub(crate) fn new(
        context: Arc<Context>,
        request: HttpRequest,
        decoder: impl FnOnce(&dyn ContentSerializer, HttpResponse) -> Result<T, ApiError> + Send + 'static,
    ) -> Self {
        Self {
            context,
            request,
            decoder: Box::new(decoder),
        }
    }

    /// The request exactly as it will be handed to the transport.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Send the request and decode the response.
    #[instrument(
        name = "dreamfactory_request",
        skip(self),
        fields(
            http.method = %self.request.method,
            http.url = %self.request.url,
            http.status_code = tracing::field::Empty,
        )
    )]
    pub async fn send(self) -> Result<T, ApiError> {
        let Self {
            context,
            request,
            decoder,
        } = self;

        let response = context.transport.send(request).await.map_err(|e| {
            tracing::debug!(error = %e, "transport failed");
            ApiError::from(e)
        })?;
        Span::current().record("http.status_code", response.status);

        let result = decoder(context.serializer.as_ref(), response);
        if let Err(err) = &result {
            tracing::debug!(error = %err, "request failed");
        }
        result
    }
}

/// Map a non-2xx response to [`ApiError::Upstream`].
pub(crate) fn ensure_success(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(upstream_error(response))
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    One(ErrorDetail),
    Many(Vec<ErrorDetail>),
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Build an upstream error from the service's error payload, falling back to
/// the raw body when it is not in either of the service's error formats.
pub(crate) fn upstream_error(response: &HttpResponse) -> ApiError {
    let detail = serde_json::from_slice::<ErrorEnvelope>(&response.body)
        .ok()
        .and_then(|envelope| match envelope.error {
            ErrorPayload::One(detail) => Some(detail),
            ErrorPayload::Many(details) => details.into_iter().next(),
        });

    let (code, message) = match detail {
        Some(ErrorDetail { code, message }) => (code, message),
        None => (None, None),
    };
    let message = message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| match preview(&response.body) {
            body if body.is_empty() => format!("HTTP {}", response.status),
            body => body,
        });

    ApiError::Upstream {
        status: response.status,
        code,
        message,
    }
}

/// Decode a single object from a successful response.
pub(crate) fn decode_one<T: DeserializeOwned>(
    serializer: &dyn ContentSerializer,
    response: HttpResponse,
) -> Result<T, ApiError> {
    ensure_success(&response)?;
    serializer.decode(&response.body)
}

/// Decode a record sequence, accepting either a bare array or the service's
/// `{"resource": [...]}` envelope.
pub(crate) fn decode_records<T: DeserializeOwned>(
    serializer: &dyn ContentSerializer,
    response: HttpResponse,
) -> Result<Vec<T>, ApiError> {
    ensure_success(&response)?;
    let tree = match serializer.decode_value(&response.body)? {
        Value::Object(mut map) if map.contains_key("resource") => {
            map.remove("resource").unwrap_or_default()
        }
        other => other,
    };
    serde_json::from_value(tree).map_err(|e| ApiError::serialization(e.to_string(), &response.body))
}

/// Succeed on any 2xx, ignoring the body.
pub(crate) fn decode_unit(_: &dyn ContentSerializer, response: HttpResponse) -> Result<(), ApiError> {
    ensure_success(&response)
}

/// Raw body of a successful response.
pub(crate) fn decode_bytes(_: &dyn ContentSerializer, response: HttpResponse) -> Result<Vec<u8>, ApiError> {
    ensure_success(&response)?;
    Ok(response.body)
}
