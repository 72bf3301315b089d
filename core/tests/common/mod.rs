//! Scripted transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dreamfactory_core::{
    AnonymousSessionPolicy, ClientConfig, DreamFactoryClient, HttpRequest, HttpResponse, Transport,
    TransportError,
};

pub const BASE_URI: &str = "http://localhost:8080";

pub const SESSION_JSON: &str = r#"{
    "session_id": "token-1",
    "id": 1,
    "name": "Dream Factory",
    "email": "dream@factory.com",
    "is_sys_admin": true
}"#;

/// Records every request and answers from a queue. An empty queue answers
/// `200 {"resource":[]}`.
#[derive(Debug, Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, status: u16, body: &str) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> HttpRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(200, r#"{"resource":[]}"#)))
    }
}

pub fn client(transport: &Arc<FakeTransport>) -> DreamFactoryClient {
    client_with(ClientConfig::new(BASE_URI), transport)
}

pub fn refreshing_client(transport: &Arc<FakeTransport>) -> DreamFactoryClient {
    client_with(
        ClientConfig::new(BASE_URI).anonymous_session(AnonymousSessionPolicy::Refresh),
        transport,
    )
}

pub fn client_with(config: ClientConfig, transport: &Arc<FakeTransport>) -> DreamFactoryClient {
    DreamFactoryClient::new(&config, Arc::clone(transport)).unwrap()
}

pub fn body_json(request: &HttpRequest) -> serde_json::Value {
    serde_json::from_slice(request.body.as_deref().expect("request has no body")).unwrap()
}
