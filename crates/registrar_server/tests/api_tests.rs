use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use registrar_core::{open_db_in_memory, MemoryBlobStore, UploadPolicy};
use registrar_server::routes::api_router;
use registrar_server::{AppState, StaticTokenProvider};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower::ServiceExt;

const TOKEN: &str = "secret-token";
const ACTOR: i64 = 7;
const BOUNDARY: &str = "registrar-test-boundary";

fn state() -> AppState {
    let conn = open_db_in_memory().unwrap();
    AppState::new(conn, Arc::new(MemoryBlobStore::new())).with_identity_provider(Arc::new(
        StaticTokenProvider::new(BTreeMap::from([(TOKEN.to_string(), ACTOR)])),
    ))
}

fn app() -> Router {
    api_router(state())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(content.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::from(body))
        .unwrap()
}

async fn create_document(app: &Router, title: &str) -> String {
    let (status, body) = send(
        app,
        json_request("POST", "/api/v1/documents", json!({ "title": title })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_reports_database_connectivity() {
    let app = app();
    let (status, body) = send(&app, empty_request("GET", "/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["database"], "connected");
}

#[tokio::test]
async fn create_list_show_and_update_university() {
    let app = app();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/universities",
            json!({ "name": "North Campus", "code": "NC" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "North Campus");
    assert_eq!(body["data"]["created_by"], ACTOR);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, empty_request("GET", "/api/v1/universities")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/v1/universities/{id}"),
            json!({ "name": "South Campus" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "South Campus");
    assert_eq!(body["data"]["updated_by"], ACTOR);

    let (status, body) = send(&app, empty_request("GET", &format!("/api/v1/universities/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "South Campus");
}

#[tokio::test]
async fn invalid_input_returns_validation_envelope() {
    let app = app();
    let (status, body) = send(
        &app,
        json_request("POST", "/api/v1/universities", json!({ "name": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert!(body["errors"]["name"].is_array());

    let (status, body) = send(
        &app,
        json_request(
            "GET",
            "/api/v1/universities?trashed=sometimes",
            Value::Null,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["trashed"].is_array());
}

#[tokio::test]
async fn malformed_json_is_unprocessable() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/universities")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_and_malformed_ids_are_not_found() {
    let app = app();
    let (status, body) = send(
        &app,
        empty_request("GET", &format!("/api/v1/documents/{}", uuid::Uuid::new_v4())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, empty_request("GET", "/api/v1/documents/not-a-uuid")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_restore_and_force_delete_flow() {
    let app = app();
    let id = create_document(&app, "Syllabus").await;

    let (status, body) = send(&app, empty_request("DELETE", &format!("/api/v1/documents/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted_by"], ACTOR);

    let (status, _) = send(&app, empty_request("GET", &format!("/api/v1/documents/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        empty_request("GET", &format!("/api/v1/documents/{id}?trashed=with")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["deleted_at"].is_i64());

    let (_, body) = send(&app, empty_request("GET", "/api/v1/documents?trashed=only")).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        empty_request("POST", &format!("/api/v1/documents/{id}/restore")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["deleted_at"].is_null());

    let (status, body) = send(
        &app,
        empty_request("DELETE", &format!("/api/v1/documents/{id}/force")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["attachments_removed"], 0);

    let (status, _) = send(
        &app,
        empty_request("GET", &format!("/api/v1/documents/{id}?trashed=with")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_requests_are_allowed_unless_actor_is_required() {
    let app = app();
    let anonymous = Request::builder()
        .method("POST")
        .uri("/api/v1/documents")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "title": "Open" }).to_string()))
        .unwrap();
    let (status, body) = send(&app, anonymous).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["created_by"].is_null());

    let strict = api_router(state().with_require_actor(true));
    let anonymous = Request::builder()
        .method("POST")
        .uri("/api/v1/documents")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "title": "Closed" }).to_string()))
        .unwrap();
    let (status, body) = send(&strict, anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let read = Request::builder()
        .uri("/api/v1/documents")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&strict, read).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/documents")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer nobody")
        .body(Body::from(json!({ "title": "Nope" }).to_string()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = send(&app, empty_request("GET", "/api/v1/documents")).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn attachment_upload_download_and_detach() {
    let app = app();
    let id = create_document(&app, "Thesis").await;

    let (status, body) = send(
        &app,
        multipart_request(
            &format!("/api/v1/documents/{id}/attachments"),
            &[("file", Some("notes.txt"), "hello registrar")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["original_name"], "notes.txt");
    assert_eq!(body["data"]["size"], 15);
    assert_eq!(body["data"]["created_by"], ACTOR);
    let attachment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        empty_request("GET", &format!("/api/v1/documents/{id}/attachments")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(empty_request(
            "GET",
            &format!("/api/v1/attachments/{attachment_id}/download"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("notes.txt"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"hello registrar");

    let (status, _) = send(
        &app,
        empty_request("DELETE", &format!("/api/v1/attachments/{attachment_id}")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        empty_request("GET", &format!("/api/v1/attachments/{attachment_id}/download")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disallowed_or_missing_file_is_a_file_error() {
    let app = app();
    let id = create_document(&app, "Report").await;

    let (status, body) = send(
        &app,
        multipart_request(
            &format!("/api/v1/documents/{id}/attachments"),
            &[("file", Some("script.exe"), "MZ")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["file"].is_array());

    let (status, body) = send(
        &app,
        multipart_request(
            &format!("/api/v1/documents/{id}/attachments"),
            &[("other", None, "x")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["file"].is_array());
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let state = AppState::new(conn, Arc::new(MemoryBlobStore::new()))
        .with_upload_policy(UploadPolicy::new(4, ["txt"]));
    let app = api_router(state);
    let id = create_document(&app, "Small").await;

    let (status, body) = send(
        &app,
        multipart_request(
            &format!("/api/v1/documents/{id}/attachments"),
            &[("file", Some("big.txt"), "more than four bytes")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["file"].is_array());

    let (_, body) = send(
        &app,
        empty_request("GET", &format!("/api/v1/documents/{id}/attachments")),
    )
    .await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn create_with_attachment_stores_both() {
    let app = app();
    let (status, body) = send(
        &app,
        multipart_request(
            "/api/v1/publications/with-attachment",
            &[
                ("data", None, r#"{"title":"Field Notes"}"#),
                ("file", Some("paper.pdf"), "%PDF-1.4"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["record"]["title"], "Field Notes");
    assert_eq!(body["data"]["attachment"]["original_name"], "paper.pdf");
    assert_eq!(
        body["data"]["attachment"]["owner_id"],
        body["data"]["record"]["id"]
    );
}

#[tokio::test]
async fn create_with_attachment_rejects_bad_data_without_storing() {
    let app = app();
    let (status, body) = send(
        &app,
        multipart_request(
            "/api/v1/documents/with-attachment",
            &[
                ("data", None, r#"{"title":""}"#),
                ("file", Some("paper.pdf"), "%PDF-1.4"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["title"].is_array());

    let (_, body) = send(&app, empty_request("GET", "/api/v1/documents")).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn status_transition_appends_comment() {
    let app = app();
    let id = create_document(&app, "Proposal").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/v1/documents/{id}/status"),
            json!({ "status": "approved", "comment": "looks good" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
    let log = body["data"]["status_log"].as_str().unwrap();
    assert!(log.contains("draft -> approved by actor 7: looks good"));

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/v1/documents/{id}/status"),
            json!({ "status": "published" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["status"].is_array());
}

#[tokio::test]
async fn course_requires_existing_university() {
    let app = app();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/courses",
            json!({ "university_id": uuid::Uuid::new_v4(), "title": "Algebra" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["university_id"].is_array());
}

#[tokio::test]
async fn download_after_force_delete_is_not_found() {
    let app = app();
    let id = create_document(&app, "Archive").await;
    let (status, body) = send(
        &app,
        multipart_request(
            &format!("/api/v1/documents/{id}/attachments"),
            &[("file", Some("scan.pdf"), "%PDF-1.4")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let attachment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        empty_request("DELETE", &format!("/api/v1/documents/{id}/force")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["attachments_removed"], 1);

    let (status, body) = send(
        &app,
        empty_request("GET", &format!("/api/v1/attachments/{attachment_id}/download")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}
