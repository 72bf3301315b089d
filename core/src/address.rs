//! Versioned endpoint addresses.
//!
//! # Design
//! The base URI is parsed and normalised once, when the client is built, so
//! a bad endpoint fails immediately instead of on the first request. After
//! that, [`EndpointAddress::resolve`] is a pure function that appends
//! `api/{version}/{resource path}/{segments…}` with exactly one `/` between
//! segments. Segments are pushed through `url`'s path-segment encoder, so an
//! identifier containing `/`, `?` or a space cannot change the shape of the
//! path.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::EnumString;
use url::Url;

use crate::error::ApiError;

/// REST API versions exposed by the service.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ApiVersion {
    V1,
    #[default]
    V2,
}

impl ApiVersion {
    /// Path segment for this version.
    pub fn as_str(self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1",
            ApiVersion::V2 => "v2",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base URI plus API version. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAddress {
    base: Url,
    version: ApiVersion,
}

impl EndpointAddress {
    /// Parse and normalise `base_uri`.
    ///
    /// Fails with [`ApiError::InvalidAddress`] unless the URI is an absolute
    /// `http`/`https` URI with a host and no query or fragment.
    pub fn new(base_uri: &str, version: ApiVersion) -> Result<Self, ApiError> {
        let invalid = |reason: &str| ApiError::InvalidAddress {
            uri: base_uri.to_string(),
            reason: reason.to_string(),
        };

        let mut base = Url::parse(base_uri.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if base.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host"));
        }
        if base.query().is_some() || base.fragment().is_some() {
            return Err(invalid("base URI must not carry a query or fragment"));
        }

        let segments: Vec<String> = base
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        base.set_path(&segments.join("/"));

        Ok(Self { base, version })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// `{base}/api/{version}/{resource_path}/{segments…}`.
    ///
    /// Empty pieces of `resource_path` and empty segments are skipped.
    pub fn resolve(&self, resource_path: &str, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push("api")
                .push(self.version.as_str())
                .extend(resource_path.split('/').filter(|s| !s.is_empty()))
                .extend(segments.iter().copied().filter(|s| !s.is_empty()));
        }
        url
    }

    /// Like [`resolve`](Self::resolve), then appends `pairs` to the query
    /// string in the order given. No `?` is added when `pairs` is empty.
    pub fn resolve_with_query(
        &self,
        resource_path: &str,
        segments: &[&str],
        pairs: &[(&str, String)],
    ) -> Url {
        let mut url = self.resolve(resource_path, segments);
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        url
    }
}
