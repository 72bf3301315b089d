//! Generic CRUD engine shared by every resource family.
//!
//! # Design
//! A family is described once by a [`Resource`] implementation (path,
//! identifier type, request and response shapes, filter capabilities) and
//! [`ResourceClient`] implements list, get, create, update and delete for
//! all of them. Each verb has a synchronous `build_*` method that validates
//! its input and returns a [`PendingRequest`]; the async method of the same
//! name builds and sends in one go. Invalid input therefore fails before
//! the transport is ever touched.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpResponse};
use crate::query::SqlQuery;
use crate::request::{decode_one, decode_records, Context, PendingRequest};
use crate::serializer::ContentSerializer;

/// Identifier of a record within a family.
pub trait ResourceId: fmt::Display + fmt::Debug + Clone + Serialize + Send + Sync + 'static {}

impl ResourceId for i64 {}
impl ResourceId for String {}

/// Bulk operations a family accepts beyond explicit identifier lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub delete_by_filter: bool,
    pub update_by_filter: bool,
}

impl Capabilities {
    pub const ALL: Capabilities = Capabilities {
        delete_by_filter: true,
        update_by_filter: true,
    };

    pub const IDS_ONLY: Capabilities = Capabilities {
        delete_by_filter: false,
        update_by_filter: false,
    };
}

/// Shape descriptor for one resource family.
pub trait Resource: Send + Sync + 'static {
    /// Singular name used in error messages, e.g. `"app"`.
    const NAME: &'static str;
    /// Path below the versioned API root, e.g. `"system/app"`.
    const PATH: &'static str;
    /// Field carrying the identifier in record bodies, e.g. `"id"`.
    const ID_FIELD: &'static str;
    const CAPABILITIES: Capabilities;

    type Id: ResourceId;
    type Request: Serialize + Send + Sync;
    type Response: DeserializeOwned + Send + 'static;

    /// Identifier of a request record; `None` for records to be created.
    fn request_id(request: &Self::Request) -> Option<&Self::Id>;
}

/// CRUD client for the family `R`.
pub struct ResourceClient<R> {
    context: Arc<Context>,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceClient<R> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> fmt::Debug for ResourceClient<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClient").field("path", &R::PATH).finish()
    }
}

impl<R: Resource> ResourceClient<R> {
    pub(crate) fn new(context: Arc<Context>) -> Self {
        Self {
            context,
            _resource: PhantomData,
        }
    }

    // -----------------------------------------------------------------------
    // Build
    // -----------------------------------------------------------------------

    /// GET `{path}` with the query flattened into the query string.
    pub fn build_list(&self, query: Option<&SqlQuery>) -> PendingRequest<Vec<R::Response>> {
        let pairs = query.map(SqlQuery::to_query_pairs).unwrap_or_default();
        let url = self.context.address.resolve_with_query(R::PATH, &[], &pairs);
        let request = self.context.http_request(HttpMethod::Get, url, None);
        PendingRequest::new(Arc::clone(&self.context), request, decode_records::<R::Response>)
    }

    /// GET `{path}/{id}`. A 404 becomes [`ApiError::NotFound`].
    pub fn build_get(
        &self,
        id: &R::Id,
        query: Option<&SqlQuery>,
    ) -> Result<PendingRequest<R::Response>, ApiError> {
        let id = id.to_string();
        if id.trim().is_empty() {
            return Err(ApiError::invalid_argument(format!("{} identifier is empty", R::NAME)));
        }
        let pairs = query.map(SqlQuery::to_query_pairs).unwrap_or_default();
        let url = self.context.address.resolve_with_query(R::PATH, &[&id], &pairs);
        let request = self.context.http_request(HttpMethod::Get, url, None);
        Ok(PendingRequest::new(
            Arc::clone(&self.context),
            request,
            move |serializer: &dyn ContentSerializer, response: HttpResponse| {
                if response.status == 404 {
                    return Err(ApiError::NotFound {
                        resource: R::NAME.to_string(),
                        id,
                    });
                }
                decode_one(serializer, response)
            },
        ))
    }

    /// POST `{path}` with the records as a JSON array.
    pub fn build_create(
        &self,
        records: &[R::Request],
    ) -> Result<PendingRequest<Vec<R::Response>>, ApiError> {
        if records.is_empty() {
            return Err(ApiError::invalid_argument(format!(
                "at least one {} is required to create",
                R::NAME
            )));
        }
        self.records_request(HttpMethod::Post, records)
    }

    /// PATCH `{path}` with the records as a JSON array. Every record must
    /// carry its identifier.
    pub fn build_update(
        &self,
        records: &[R::Request],
    ) -> Result<PendingRequest<Vec<R::Response>>, ApiError> {
        if records.is_empty() {
            return Err(ApiError::invalid_argument(format!(
                "at least one {} is required to update",
                R::NAME
            )));
        }
        if let Some(index) = records.iter().position(|r| R::request_id(r).is_none()) {
            return Err(ApiError::invalid_argument(format!(
                "{} at position {index} has no identifier",
                R::NAME
            )));
        }
        self.records_request(HttpMethod::Patch, records)
    }

    /// DELETE `{path}` with `[{"id": …}, …]` as the body. The service echoes
    /// the deleted records.
    pub fn build_delete(&self, ids: &[R::Id]) -> Result<PendingRequest<Vec<R::Response>>, ApiError> {
        self.build_delete_with(ids, &[])
    }

    /// [`build_delete`](Self::build_delete) with family-specific query pairs.
    pub(crate) fn build_delete_with(
        &self,
        ids: &[R::Id],
        pairs: &[(&str, String)],
    ) -> Result<PendingRequest<Vec<R::Response>>, ApiError> {
        if ids.is_empty() {
            return Err(ApiError::invalid_argument(format!(
                "at least one {} identifier is required to delete",
                R::NAME
            )));
        }
        let records: Vec<_> = ids
            .iter()
            .map(|id| IdRecord {
                field: R::ID_FIELD,
                id,
            })
            .collect();
        let body = self.context.encode(&records)?;
        let url = self.context.address.resolve_with_query(R::PATH, &[], pairs);
        let request = self.context.http_request(HttpMethod::Delete, url, Some(body));
        Ok(PendingRequest::new(
            Arc::clone(&self.context),
            request,
            decode_records::<R::Response>,
        ))
    }

    /// DELETE `{path}` for every record matching the query's filter.
    pub fn build_delete_by_filter(
        &self,
        query: &SqlQuery,
    ) -> Result<PendingRequest<Vec<R::Response>>, ApiError> {
        if !R::CAPABILITIES.delete_by_filter {
            return Err(ApiError::invalid_argument(format!(
                "{} does not support delete by filter",
                R::PATH
            )));
        }
        ensure_filter::<R>(query)?;
        let url = self
            .context
            .address
            .resolve_with_query(R::PATH, &[], &query.to_query_pairs());
        let request = self.context.http_request(HttpMethod::Delete, url, None);
        Ok(PendingRequest::new(
            Arc::clone(&self.context),
            request,
            decode_records::<R::Response>,
        ))
    }

    /// PATCH `{path}` applying `patch` to every record matching the filter.
    pub fn build_update_by_filter(
        &self,
        query: &SqlQuery,
        patch: &R::Request,
    ) -> Result<PendingRequest<Vec<R::Response>>, ApiError> {
        if !R::CAPABILITIES.update_by_filter {
            return Err(ApiError::invalid_argument(format!(
                "{} does not support update by filter",
                R::PATH
            )));
        }
        ensure_filter::<R>(query)?;
        let body = self.context.encode(patch)?;
        let url = self
            .context
            .address
            .resolve_with_query(R::PATH, &[], &query.to_query_pairs());
        let request = self.context.http_request(HttpMethod::Patch, url, Some(body));
        Ok(PendingRequest::new(
            Arc::clone(&self.context),
            request,
            decode_records::<R::Response>,
        ))
    }

    fn records_request(
        &self,
        method: HttpMethod,
        records: &[R::Request],
    ) -> Result<PendingRequest<Vec<R::Response>>, ApiError> {
        let body = self.context.encode(records)?;
        let url = self.context.address.resolve(R::PATH, &[]);
        let request = self.context.http_request(method, url, Some(body));
        Ok(PendingRequest::new(
            Arc::clone(&self.context),
            request,
            decode_records::<R::Response>,
        ))
    }

    // -----------------------------------------------------------------------
    // Send
    // -----------------------------------------------------------------------

    /// Records matching `query`, or all records when `query` is `None`.
    /// An empty result is `Ok(vec![])`.
    pub async fn list(&self, query: Option<&SqlQuery>) -> Result<Vec<R::Response>, ApiError> {
        self.build_list(query).send().await
    }

    pub async fn get(&self, id: &R::Id) -> Result<R::Response, ApiError> {
        self.build_get(id, None)?.send().await
    }

    /// Like [`get`](Self::get) with field selection or related records.
    pub async fn get_with(&self, id: &R::Id, query: &SqlQuery) -> Result<R::Response, ApiError> {
        self.build_get(id, Some(query))?.send().await
    }

    /// Create records; the response lists them in submission order.
    pub async fn create(&self, records: &[R::Request]) -> Result<Vec<R::Response>, ApiError> {
        self.build_create(records)?.send().await
    }

    pub async fn update(&self, records: &[R::Request]) -> Result<Vec<R::Response>, ApiError> {
        self.build_update(records)?.send().await
    }

    pub async fn delete(&self, ids: &[R::Id]) -> Result<Vec<R::Response>, ApiError> {
        self.build_delete(ids)?.send().await
    }

    pub async fn delete_by_filter(&self, query: &SqlQuery) -> Result<Vec<R::Response>, ApiError> {
        self.build_delete_by_filter(query)?.send().await
    }

    pub async fn update_by_filter(
        &self,
        query: &SqlQuery,
        patch: &R::Request,
    ) -> Result<Vec<R::Response>, ApiError> {
        self.build_update_by_filter(query, patch)?.send().await
    }
}

/// One element of a delete body: `{"<id field>": <id>}`.
struct IdRecord<'a, I> {
    field: &'static str,
    id: &'a I,
}

impl<I: Serialize> Serialize for IdRecord<'_, I> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.field, self.id)?;
        map.end()
    }
}

fn ensure_filter<R: Resource>(query: &SqlQuery) -> Result<(), ApiError> {
    match query.filter.as_deref().map(str::trim) {
        Some(filter) if !filter.is_empty() => Ok(()),
        _ => Err(ApiError::invalid_argument(format!(
            "a filter is required for bulk operations on {}",
            R::PATH
        ))),
    }
}
