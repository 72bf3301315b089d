use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, SESSION_HEADER};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(SESSION_HEADER, token);
    }
    match body {
        Some(body) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .unwrap(),
        None => builder.body(String::new()).unwrap(),
    }
}

async fn login(app: &Router) -> String {
    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v2/user/session",
            None,
            Some(json!({"email": "dream@factory.com", "password": "dreamfactory"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let session = body_json(resp).await;
    session["session_token"].as_str().unwrap().to_string()
}

// --- session ---

#[tokio::test]
async fn login_with_bad_credentials_returns_401_in_error_format() {
    let resp = app()
        .oneshot(request(
            "POST",
            "/api/v2/user/session",
            None,
            Some(json!({"email": "dream@factory.com", "password": "nope"})),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], 401);
    assert!(body["error"]["message"].as_str().unwrap().contains("Invalid credentials"));
}

#[tokio::test]
async fn session_round_trip() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .clone()
        .oneshot(request("GET", "/api/v2/user/session", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["session_id"], token.as_str());

    let resp = app
        .clone()
        .oneshot(request("DELETE", "/api/v2/user/session", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(request("GET", "/api/v2/user/session", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn system_endpoints_need_a_session() {
    let resp = app()
        .oneshot(request("GET", "/api/v2/system/app", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_version_returns_404() {
    let resp = app()
        .oneshot(request(
            "POST",
            "/api/v9/user/session",
            None,
            Some(json!({"email": "dream@factory.com", "password": "dreamfactory"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- records ---

#[tokio::test]
async fn list_of_empty_family_is_an_empty_envelope() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .oneshot(request("GET", "/api/v2/system/role", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"resource": []}));
}

#[tokio::test]
async fn unknown_family_returns_404() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .oneshot(request("GET", "/api/v2/system/widget", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_filter_and_delete() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v2/system/lookup",
            Some(&token),
            Some(json!([{"name": "a", "value": "1"}, {"name": "b", "value": "2"}])),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created = body_json(resp).await;
    assert_eq!(created["resource"][0]["id"], 1);
    assert_eq!(created["resource"][1]["id"], 2);

    let resp = app
        .clone()
        .oneshot(request(
            "GET",
            "/api/v2/system/lookup?filter=name+%3D+%27b%27&fields=name",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({"resource": [{"name": "b"}]}));

    let resp = app
        .clone()
        .oneshot(request("DELETE", "/api/v2/system/lookup?ids=1%2C2", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["resource"].as_array().unwrap().len(), 2);

    let resp = app
        .oneshot(request("GET", "/api/v2/system/lookup/1", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_takes_identifiers_from_the_body() {
    let app = app();
    let token = login(&app).await;
    app.clone()
        .oneshot(request(
            "POST",
            "/api/v2/system/event_script",
            Some(&token),
            Some(json!([{"name": "user.login", "type": "v8js"}])),
        ))
        .await
        .unwrap();

    let resp = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/api/v2/system/event_script",
            Some(&token),
            Some(json!([{"name": "user.login"}])),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["resource"][0]["type"], "v8js");

    let resp = app
        .oneshot(request("GET", "/api/v2/system/event_script/user.login", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_storage_is_only_for_apps() {
    let app = app();
    let token = login(&app).await;
    for family in ["app", "role"] {
        app.clone()
            .oneshot(request(
                "POST",
                &format!("/api/v2/system/{family}"),
                Some(&token),
                Some(json!([{"name": "a"}])),
            ))
            .await
            .unwrap();
    }

    let resp = app
        .clone()
        .oneshot(request(
            "DELETE",
            "/api/v2/system/role?delete_storage=true",
            Some(&token),
            Some(json!([{"id": 1}])),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(request(
            "DELETE",
            "/api/v2/system/app?delete_storage=true",
            Some(&token),
            Some(json!([{"id": 1}])),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["resource"][0]["name"], "a");
}

#[tokio::test]
async fn create_without_records_returns_400() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .oneshot(request("POST", "/api/v2/system/app", Some(&token), Some(json!([]))))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_filter_returns_400() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .oneshot(request("GET", "/api/v2/system/user?filter=nope", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Invalid filter"));
}

#[tokio::test]
async fn update_of_missing_record_returns_404() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .oneshot(request(
            "PATCH",
            "/api/v2/system/role",
            Some(&token),
            Some(json!([{"id": 77, "name": "ghost"}])),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn app_package_is_served_as_bytes() {
    let app = app();
    let token = login(&app).await;
    app.clone()
        .oneshot(request(
            "POST",
            "/api/v2/system/app",
            Some(&token),
            Some(json!([{"name": "inventory", "api_name": "inventory"}])),
        ))
        .await
        .unwrap();

    let resp = app
        .oneshot(request("GET", "/api/v2/system/app/1?pkg=true", Some(&token), None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/zip");
    assert_eq!(&body_bytes(resp).await[..], b"PK\x03\x04package:inventory");
}

// --- config and password ---

#[tokio::test]
async fn config_patch_merges_fields() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .oneshot(request(
            "PATCH",
            "/api/v2/system/config",
            Some(&token),
            Some(json!({"allow_open_registration": true})),
        ))
        .await
        .unwrap();

    let config = body_json(resp).await;
    assert_eq!(config["allow_open_registration"], true);
    assert_eq!(config["db_version"], "2015_11_06");
}

#[tokio::test]
async fn password_reset_needs_no_session() {
    let resp = app()
        .oneshot(request(
            "POST",
            "/api/v2/user/password?reset=true",
            None,
            Some(json!({"email": "dream@factory.com"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["success"], true);
}

#[tokio::test]
async fn password_change_checks_the_old_password() {
    let app = app();
    let token = login(&app).await;

    let resp = app
        .oneshot(request(
            "POST",
            "/api/v2/user/password",
            Some(&token),
            Some(json!({"old_password": "wrong", "new_password": "better"})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
