mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use common::{insert_record, setup_state};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use zero_share::create_app;
use zero_share::utils::auth::create_jwt;

const BOUNDARY: &str = "zero-share-test-boundary";

fn multipart_body(fields: &[(&str, &str)], file: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(file) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"blob.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(fields: &[(&str, &str)], file: Option<&[u8]>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/files/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(multipart_body(fields, file))).unwrap()
}

fn base_fields<'a>(max_downloads: &'a str, password: Option<&'a str>) -> Vec<(&'a str, &'a str)> {
    let mut fields = vec![
        ("original_name", "photo.jpg"),
        ("size_bytes", "5"),
        ("mime_type", "image/jpeg"),
        ("exported_key", r#"{"kty":"oct","alg":"C20P","k":"AAAA"}"#),
        ("nonce", "AAECAwQFBgcICQoL"),
        ("max_downloads", max_downloads),
        ("expiry_hours", "24"),
    ];
    if let Some(password) = password {
        fields.push(("password", password));
    }
    fields
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_download(id: &str, password: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri(format!("/api/files/download/{id}"));
    match password {
        Some(p) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "password": p }).to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_upload_info_download_flow() {
    let (state, _) = setup_state().await;
    let app = create_app(state);

    let (status, receipt) = send(
        &app,
        upload_request(&base_fields("2", None), Some(b"\x01\x02\x03ciphertext".as_slice()), None),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = receipt["id"].as_str().unwrap().to_string();
    assert_eq!(receipt["download_url"], format!("http://share.test/download/{id}"));

    let (status, info) = send(&app, get(&format!("/api/files/info/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["original_name"], "photo.jpg");
    assert_eq!(info["requires_password"], false);
    assert!(info.get("password_hash").is_none());
    assert!(info.get("exported_key").is_none());

    let (status, grant) = send(&app, post_download(&id, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grant["download_count"], 1);
    assert_eq!(grant["nonce"], "AAECAwQFBgcICQoL");
    assert_eq!(grant["encrypted_data"], "AQIDY2lwaGVydGV4dA==");

    let (status, _) = send(&app, get(&format!("/api/files/download/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, post_download(&id, None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "LIMIT_REACHED");
}

#[tokio::test]
async fn test_password_statuses() {
    let (state, _) = setup_state().await;
    let app = create_app(state);

    let (_, receipt) = send(
        &app,
        upload_request(&base_fields("1", Some("s3cret")), Some(b"ct".as_slice()), None),
    )
    .await;
    let id = receipt["id"].as_str().unwrap();

    let (status, body) = send(&app, post_download(id, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "PASSWORD_REQUIRED");

    let (status, body) = send(&app, post_download(id, Some("guess"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PASSWORD_INVALID");

    let (status, _) = send(&app, post_download(id, Some("s3cret"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_not_found_and_expired_statuses() {
    let (state, store) = setup_state().await;
    insert_record(&state.db, store.as_ref(), "old", Utc::now() - Duration::hours(1)).await;
    let app = create_app(state);

    let (status, body) = send(&app, get("/api/files/info/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(&app, get("/api/files/info/old", None)).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["code"], "EXPIRED");

    let (status, _) = send(&app, post_download("old", None)).await;
    assert_eq!(status, StatusCode::GONE);
}

#[tokio::test]
async fn test_upload_validation_errors() {
    let (state, store) = setup_state().await;
    let app = create_app(state);

    let (status, body) = send(
        &app,
        upload_request(&base_fields("101", None), Some(b"ct".as_slice()), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().starts_with("max_downloads"));

    let (status, _) = send(&app, upload_request(&base_fields("1", None), None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        upload_request(&base_fields("many", None), Some(b"ct".as_slice()), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(store.is_empty());
}

#[tokio::test]
async fn test_upload_errors_follow_field_order_not_arrival_order() {
    let (state, store) = setup_state().await;
    let app = create_app(state);

    // max_downloads arrives before original_name
    let fields = [
        ("max_downloads", "many"),
        ("original_name", ""),
        ("size_bytes", "5"),
        ("mime_type", "image/jpeg"),
        ("exported_key", r#"{"kty":"oct"}"#),
        ("nonce", "AAECAwQFBgcICQoL"),
    ];
    let (status, body) = send(&app, upload_request(&fields, Some(b"ct".as_slice()), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("original_name"));

    let (status, body) = send(&app, upload_request(&fields, None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("original_name"));

    let (status, body) = send(&app, upload_request(&base_fields("1", None), None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("file"));

    assert!(store.is_empty());
}

#[tokio::test]
async fn test_malformed_download_body() {
    let (state, _) = setup_state().await;
    let app = create_app(state);
    let (_, receipt) = send(&app, upload_request(&base_fields("1", None), Some(b"ct".as_slice()), None)).await;
    let id = receipt["id"].as_str().unwrap();

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/files/download/{id}"))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The malformed request consumed nothing.
    let (_, info) = send(&app, get(&format!("/api/files/info/{id}"), None)).await;
    assert_eq!(info["download_count"], 0);
}

#[tokio::test]
async fn test_owner_endpoints() {
    let (state, _) = setup_state().await;
    let secret = state.config.jwt_secret.clone();
    let app = create_app(state);
    let alice = create_jwt("alice", &secret).unwrap();
    let bob = create_jwt("bob", &secret).unwrap();

    let (status, receipt) = send(
        &app,
        upload_request(&base_fields("3", None), Some(b"ct".as_slice()), Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = receipt["id"].as_str().unwrap().to_string();
    send(&app, post_download(&id, None)).await;

    let (status, _) = send(&app, get("/api/files", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, files) = send(&app, get("/api/files", Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(files.as_array().unwrap().len(), 1);

    let (_, stats) = send(&app, get("/api/files/stats", Some(&alice))).await;
    assert_eq!(stats["total_files"], 1);
    assert_eq!(stats["total_downloads"], 1);

    let (status, logs) = send(&app, get(&format!("/api/files/{id}/logs"), Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logs.as_array().unwrap().len(), 2);
    assert_eq!(logs[0]["access_type"], "download");

    let delete = |token: &str| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/files/{id}"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&app, delete(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, delete(&alice)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&format!("/api/files/info/{id}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_token_on_upload_is_rejected() {
    let (state, store) = setup_state().await;
    let app = create_app(state);

    let (status, _) = send(
        &app,
        upload_request(&base_fields("1", None), Some(b"ct".as_slice()), Some("not-a-jwt")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_manual_sweep_and_health() {
    let (state, store) = setup_state().await;
    let token = create_jwt("operator", &state.config.jwt_secret).unwrap();
    insert_record(&state.db, store.as_ref(), "old", Utc::now() - Duration::hours(1)).await;
    let app = create_app(state);

    let sweep = || {
        Request::builder()
            .method("POST")
            .uri("/api/maintenance/sweep")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(&app, sweep()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["report"]["reclaimed"][0], "old");
    assert!(store.is_empty());

    let (status, health) = send(&app, get("/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["database"], "connected");
    assert_eq!(health["storage"], "connected");
    assert_eq!(health["sweeper"], "idle");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (state, _) = setup_state().await;
    let app = create_app(state);

    let req = Request::builder()
        .uri("/api/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");
}
