//! The I/O seam between the client engine and the network.
//!
//! # Design
//! The engine never opens a socket. It hands a finished [`HttpRequest`] to a
//! `Transport` and classifies whatever comes back. Implementations decide
//! how to reach the network (reqwest, ureq, hyper, a test fake) and are
//! expected to report timeouts and cancellations through
//! [`TransportError`] rather than as generic connection failures.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Sends one request and returns the raw response.
///
/// A response with a non-success status is still `Ok`; only failures below
/// HTTP are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}
