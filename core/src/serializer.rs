//! Content serialization between typed values and wire bytes.
//!
//! # Design
//! [`ContentSerializer`] is object-safe so the client can hold it as
//! `Arc<dyn ContentSerializer>` and swap wire formats without becoming
//! generic. Implementations only translate between bytes and a
//! `serde_json::Value` tree; the typed `encode` and `decode` helpers on
//! `dyn ContentSerializer` do the rest with
//! serde, which rejects type mismatches instead of coercing them and
//! ignores unknown fields.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// Converts payloads to and from their wire representation.
pub trait ContentSerializer: fmt::Debug + Send + Sync {
    /// MIME type sent as `Content-Type` and `Accept`.
    fn content_type(&self) -> &'static str;

    fn encode_value(&self, value: &Value) -> Result<Vec<u8>, ApiError>;

    fn decode_value(&self, bytes: &[u8]) -> Result<Value, ApiError>;
}

impl<'a> dyn ContentSerializer + 'a {
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, ApiError> {
        let tree = serde_json::to_value(value)
            .map_err(|e| ApiError::serialization(e.to_string(), &[]))?;
        self.encode_value(&tree)
    }

    /// Decode `bytes` into `T`. A shape mismatch carries a preview of
    /// `bytes` for diagnostics.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ApiError> {
        let tree = self.decode_value(bytes)?;
        serde_json::from_value(tree).map_err(|e| ApiError::serialization(e.to_string(), bytes))
    }
}

/// `application/json` serializer backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonContentSerializer;

impl ContentSerializer for JsonContentSerializer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode_value(&self, value: &Value) -> Result<Vec<u8>, ApiError> {
        serde_json::to_vec(value).map_err(|e| ApiError::serialization(e.to_string(), &[]))
    }

    fn decode_value(&self, bytes: &[u8]) -> Result<Value, ApiError> {
        serde_json::from_slice(bytes).map_err(|e| ApiError::serialization(e.to_string(), bytes))
    }
}
