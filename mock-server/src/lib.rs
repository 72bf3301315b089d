//! In-memory stand-in for the DreamFactory administrative API.
//!
//! Serves the session, password, config and `system/{family}` endpoints
//! under `/api/{v1|v2}` with DreamFactory's envelopes and error format.
//! Everything except login and password reset needs a session token from
//! a prior login (`dream@factory.com` / `dreamfactory`).

pub mod store;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::{Filter, Record, Selection, Store, StoreError, ADMIN_EMAIL};

pub const SESSION_HEADER: &str = "x-dreamfactory-session-token";

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route(
            "/api/{version}/user/session",
            post(login).get(current_session).delete(logout),
        )
        .route("/api/{version}/system/admin/session", post(login))
        .route("/api/{version}/user/password", post(password))
        .route("/api/{version}/system/config", get(get_config).patch(update_config))
        .route(
            "/api/{version}/system/{family}",
            get(list_records)
                .post(create_records)
                .patch(update_records)
                .delete(delete_records),
        )
        .route("/api/{version}/system/{family}/{id}", get(get_record))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failure rendered in DreamFactory's `{"error":{...}}` format.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    message: String,
}

impl Failure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "There is no valid session for the current request.",
        )
    }
}

impl From<StoreError> for Failure {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(message) => Self::new(StatusCode::NOT_FOUND, message),
            StoreError::BadRequest(message) => Self::bad_request(message),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = json!({"error": {"code": self.status.as_u16(), "message": self.message}});
        (self.status, Json(body)).into_response()
    }
}

type Reply = Result<Json<Value>, Failure>;

// ---------------------------------------------------------------------------
// Request shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct VersionPath {
    version: String,
}

#[derive(Deserialize)]
struct FamilyPath {
    version: String,
    family: String,
}

#[derive(Deserialize)]
struct RecordPath {
    version: String,
    family: String,
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Params {
    ids: Option<String>,
    filter: Option<String>,
    fields: Option<String>,
    order: Option<String>,
    offset: Option<usize>,
    limit: Option<usize>,
    #[serde(default)]
    pkg: bool,
    #[serde(default)]
    sdk: bool,
    #[serde(default)]
    reset: bool,
    #[serde(default)]
    delete_storage: bool,
}

impl Params {
    fn filter(&self) -> Result<Option<Filter>, Failure> {
        match self.filter.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(Some(Filter::parse(text)?)),
            _ => Ok(None),
        }
    }

    fn ids(&self) -> Option<Vec<String>> {
        self.ids.as_deref().map(|ids| {
            ids.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
    #[serde(default)]
    duration: Option<i64>,
}

// ---------------------------------------------------------------------------
// Guards
// ---------------------------------------------------------------------------

fn check_version(version: &str) -> Result<(), Failure> {
    match version {
        "v1" | "v2" => Ok(()),
        other => Err(Failure::new(
            StatusCode::NOT_FOUND,
            format!("API version '{other}' is not supported."),
        )),
    }
}

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

fn authorize(store: &Store, headers: &HeaderMap) -> Result<(), Failure> {
    match session_token(headers) {
        Some(token) if store.sessions.contains(token) => Ok(()),
        _ => Err(Failure::unauthorized()),
    }
}

/// Accept either a bare array or a `{"resource": [...]}` envelope.
fn records(body: Value) -> Result<Vec<Record>, Failure> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("resource") {
            Some(Value::Array(items)) => items,
            _ => return Err(Failure::bad_request("No record(s) detected in request.")),
        },
        _ => return Err(Failure::bad_request("No record(s) detected in request.")),
    };
    if items.is_empty() {
        return Err(Failure::bad_request("No record(s) detected in request."));
    }
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            _ => Err(Failure::bad_request("Records must be objects.")),
        })
        .collect()
}

fn envelope(records: Vec<Record>) -> Json<Value> {
    Json(json!({ "resource": records }))
}

fn session_body(token: &str) -> Value {
    json!({
        "session_id": token,
        "session_token": token,
        "id": 1,
        "name": "Dream Factory",
        "first_name": "Dream",
        "last_name": "Factory",
        "email": ADMIN_EMAIL,
        "is_sys_admin": true,
        "host": "localhost",
    })
}

// ---------------------------------------------------------------------------
// Session and password
// ---------------------------------------------------------------------------

async fn login(
    State(db): State<Db>,
    Path(path): Path<VersionPath>,
    Json(body): Json<LoginBody>,
) -> Reply {
    check_version(&path.version)?;
    let mut store = db.write().await;
    if body.email != ADMIN_EMAIL || body.password != store.password {
        info!(email = %body.email, "login rejected");
        return Err(Failure::new(
            StatusCode::UNAUTHORIZED,
            "Invalid credentials supplied.",
        ));
    }
    let token = Uuid::new_v4().simple().to_string();
    store.sessions.insert(token.clone());
    info!(email = %body.email, duration = ?body.duration, "session created");
    Ok(Json(session_body(&token)))
}

async fn current_session(
    State(db): State<Db>,
    Path(path): Path<VersionPath>,
    headers: HeaderMap,
) -> Reply {
    check_version(&path.version)?;
    let store = db.read().await;
    authorize(&store, &headers)?;
    let token = session_token(&headers).unwrap_or_default();
    Ok(Json(session_body(token)))
}

async fn logout(State(db): State<Db>, Path(path): Path<VersionPath>, headers: HeaderMap) -> Reply {
    check_version(&path.version)?;
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    if let Some(token) = session_token(&headers) {
        store.sessions.remove(token);
    }
    info!("session closed");
    Ok(Json(json!({"success": true})))
}

async fn password(
    State(db): State<Db>,
    Path(path): Path<VersionPath>,
    Query(params): Query<Params>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    check_version(&path.version)?;
    let mut store = db.write().await;

    if params.reset {
        let email = body.get("email").and_then(Value::as_str).unwrap_or_default();
        if email.is_empty() {
            return Err(Failure::bad_request("Missing required email for password reset."));
        }
        debug!(%email, "password reset requested");
        return Ok(Json(json!({"success": true})));
    }

    authorize(&store, &headers)?;
    let old = body.get("old_password").and_then(Value::as_str).unwrap_or_default();
    let new = body.get("new_password").and_then(Value::as_str).unwrap_or_default();
    if new.is_empty() {
        return Err(Failure::bad_request("Missing required new password."));
    }
    if old != store.password {
        return Err(Failure::bad_request("The password supplied does not match."));
    }
    store.password = new.to_string();
    info!("password changed");
    Ok(Json(json!({"success": true})))
}

// ---------------------------------------------------------------------------
// System config
// ---------------------------------------------------------------------------

async fn get_config(State(db): State<Db>, Path(path): Path<VersionPath>, headers: HeaderMap) -> Reply {
    check_version(&path.version)?;
    let store = db.read().await;
    authorize(&store, &headers)?;
    Ok(Json(Value::Object(store.config.clone())))
}

async fn update_config(
    State(db): State<Db>,
    Path(path): Path<VersionPath>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    check_version(&path.version)?;
    let mut store = db.write().await;
    authorize(&store, &headers)?;
    let Value::Object(changes) = body else {
        return Err(Failure::bad_request("Config update must be an object."));
    };
    store.config.extend(changes);
    Ok(Json(Value::Object(store.config.clone())))
}

// ---------------------------------------------------------------------------
// Record families
// ---------------------------------------------------------------------------

async fn list_records(
    State(db): State<Db>,
    Path(path): Path<FamilyPath>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> Reply {
    check_version(&path.version)?;
    let store = db.read().await;
    authorize(&store, &headers)?;

    let selection = Selection {
        ids: params.ids(),
        filter: params.filter()?,
        fields: params
            .fields
            .as_deref()
            .map(|f| f.split(',').map(str::trim).collect()),
        order: params.order.as_deref(),
        offset: params.offset.unwrap_or(0),
        limit: params.limit,
    };
    let found = store.family(&path.family)?.list(&selection);
    debug!(family = %path.family, count = found.len(), "records listed");
    Ok(envelope(found))
}

async fn get_record(
    State(db): State<Db>,
    Path(path): Path<RecordPath>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> Result<Response, Failure> {
    check_version(&path.version)?;
    let store = db.read().await;
    authorize(&store, &headers)?;

    let record = store
        .family(&path.family)?
        .get(&path.id)
        .ok_or_else(|| Failure::new(StatusCode::NOT_FOUND, format!("Record '{}' not found.", path.id)))?;

    if path.family == "app" && (params.pkg || params.sdk) {
        let kind = if params.pkg { "package" } else { "sdk" };
        let name = record.get("name").and_then(Value::as_str).unwrap_or_default();
        let bytes = format!("PK\u{3}\u{4}{kind}:{name}").into_bytes();
        return Ok(([(header::CONTENT_TYPE, "application/zip")], bytes).into_response());
    }
    Ok(Json(Value::Object(record)).into_response())
}

async fn create_records(
    State(db): State<Db>,
    Path(path): Path<FamilyPath>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    check_version(&path.version)?;
    let mut store = db.write().await;
    authorize(&store, &headers)?;

    let batch = records(body)?;
    let created = store.family_mut(&path.family)?.insert(batch)?;
    info!(family = %path.family, count = created.len(), "records created");
    Ok(envelope(created))
}

async fn update_records(
    State(db): State<Db>,
    Path(path): Path<FamilyPath>,
    Query(params): Query<Params>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    check_version(&path.version)?;
    let mut store = db.write().await;
    authorize(&store, &headers)?;

    let family = store.family_mut(&path.family)?;
    let updated = match params.filter()? {
        Some(filter) => {
            let Value::Object(patch) = body else {
                return Err(Failure::bad_request("Filtered update takes a single record."));
            };
            family.update_matching(&filter, &patch)
        }
        None => family.update(records(body)?)?,
    };
    info!(family = %path.family, count = updated.len(), "records updated");
    Ok(envelope(updated))
}

async fn delete_records(
    State(db): State<Db>,
    Path(path): Path<FamilyPath>,
    Query(params): Query<Params>,
    headers: HeaderMap,
    body: Bytes,
) -> Reply {
    check_version(&path.version)?;
    let mut store = db.write().await;
    authorize(&store, &headers)?;

    if params.delete_storage && path.family != "app" {
        return Err(Failure::bad_request("delete_storage applies to apps only."));
    }
    let family = store.family_mut(&path.family)?;
    let keys = if body.is_empty() {
        params.ids()
    } else {
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| Failure::bad_request(format!("Invalid JSON in request body: {e}")))?;
        Some(family.keys(&records(value)?)?)
    };
    let removed = match (keys, params.filter()?) {
        (Some(keys), _) if !keys.is_empty() => family.remove(&keys)?,
        (_, Some(filter)) => family.remove_matching(&filter),
        _ => return Err(Failure::bad_request("No record(s) detected in request.")),
    };
    if params.delete_storage {
        debug!(count = removed.len(), "app storage removed");
    }
    info!(family = %path.family, count = removed.len(), "records deleted");
    Ok(envelope(removed))
}
