use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use plangraph::engine::SqliteEngine;
use plangraph::server::{build_router, ServerOptions, ServerState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const SCHEMA: &str = "
    CREATE TABLE actor (
        actor_id INTEGER PRIMARY KEY,
        first_name VARCHAR(45)
    );
    INSERT INTO actor VALUES (1, 'PENELOPE'), (2, 'NICK');
";

fn seed_database(path: &Path) {
    let engine = SqliteEngine::open(path).expect("create database");
    engine.execute_batch(SCHEMA).expect("schema applies");
}

fn test_app(read_only: bool) -> (Router, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("dvdrental.db");
    seed_database(&db_path);

    let options = ServerOptions {
        db_path,
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        uploads_dir: dir.path().join("uploads"),
        assets_dir: None,
        read_only,
        allow_origins: Vec::new(),
    };
    let state = Arc::new(ServerState::new(options));
    (build_router(state), dir)
}

fn get(path: &str) -> Request<Body> {
    Request::get(path).body(Body::empty()).expect("request")
}

fn post_json(path: &str, payload: Value) -> Request<Body> {
    Request::post(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_reports_status_and_mode() {
    let (app, _dir) = test_app(true);
    let response = app.oneshot(get("/health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["read_only"], true);
}

#[tokio::test]
async fn test_queries_lists_samples() {
    let (app, _dir) = test_app(false);
    let response = app.oneshot(get("/api/test-queries")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let samples = body.as_array().expect("array of samples");
    assert!(!samples.is_empty());
    assert!(samples[0]["name"].is_string());
    assert!(samples[0]["query"].is_string());
}

#[tokio::test]
async fn current_database_reports_file_stem() {
    let (app, _dir) = test_app(false);
    let response = app.oneshot(get("/api/database")).await.expect("response");
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["currentDatabase"], "dvdrental");
}

#[tokio::test]
async fn query_without_text_is_rejected() {
    let (app, _dir) = test_app(false);
    let response = app
        .oneshot(post_json("/api/query", json!({})))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn query_executes_and_returns_rows() {
    let (app, _dir) = test_app(false);
    let response = app
        .oneshot(post_json(
            "/api/query",
            json!({ "query": "SELECT actor_id, first_name FROM actor ORDER BY actor_id" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["rowCount"], 2);
    assert_eq!(body["rows"][0]["first_name"], "PENELOPE");
}

#[tokio::test]
async fn invalid_sql_surfaces_as_server_error_payload() {
    let (app, _dir) = test_app(false);
    let response = app
        .oneshot(post_json("/api/query", json!({ "query": "NOT SQL" })))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn explain_returns_the_full_analysis_payload() {
    let (app, _dir) = test_app(false);
    let response = app
        .oneshot(post_json(
            "/api/explain",
            json!({ "query": "SELECT * FROM actor" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["plan"]["tree"]["nodeType"], "Seq Scan");
    assert_eq!(body["plan"]["stats"]["totalNodes"], 1);
    assert_eq!(body["plan"]["originalQuery"], "SELECT * FROM actor");
    assert!(body["plan"]["nodes"].is_array());
    assert!(body["plan"]["executionOrder"].is_array());
    assert!(body["plan"]["bottlenecks"].is_array());
}

#[tokio::test]
async fn query_graph_returns_nodes_edges_and_positions() {
    let (app, _dir) = test_app(false);
    let response = app
        .oneshot(post_json(
            "/api/query-graph",
            json!({ "query": "SELECT * FROM actor" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["error"], false);

    let nodes = body["graph"]["nodes"].as_array().expect("nodes");
    let edges = body["graph"]["edges"].as_array().expect("edges");
    assert_eq!(nodes.len(), 2);
    assert_eq!(edges.len(), 1);
    assert_eq!(nodes[0]["type"], "Table");
    assert_eq!(nodes[1]["type"], "Scan");
    assert!(nodes[0]["position"]["x"].is_number());
    assert_eq!(edges[0]["source"], nodes[0]["id"]);
    assert_eq!(edges[0]["target"], nodes[1]["id"]);
}

#[tokio::test]
async fn upload_is_forbidden_in_read_only_mode() {
    let (app, _dir) = test_app(true);
    let boundary = "plangraph-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"database\"; filename=\"demo.sql\"\r\n\
         Content-Type: application/sql\r\n\r\n\
         CREATE TABLE t (id INTEGER PRIMARY KEY);\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::post("/api/database/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn upload_replaces_the_current_database() {
    let (app, _dir) = test_app(false);
    let boundary = "plangraph-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"database\"; filename=\"demo.sql\"\r\n\
         Content-Type: application/sql\r\n\r\n\
         CREATE TABLE inventory (inventory_id INTEGER PRIMARY KEY);\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::post("/api/database/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let upload = body_json(response).await;
    assert_eq!(upload["success"], true);
    let filename = upload["filename"].as_str().expect("filename");
    assert!(filename.ends_with("-demo.sql"));

    // The server now answers over the uploaded database.
    let response = app
        .clone()
        .oneshot(get("/api/database"))
        .await
        .expect("response");
    let body = body_json(response).await;
    let current = body["currentDatabase"].as_str().expect("name");
    assert!(current.ends_with("-demo"), "current database: {current}");

    let response = app
        .oneshot(post_json(
            "/api/query",
            json!({ "query": "SELECT COUNT(*) AS n FROM inventory" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["rows"][0]["n"], 0);
}

#[tokio::test]
async fn upload_rejects_unsupported_file_types() {
    let (app, _dir) = test_app(false);
    let boundary = "plangraph-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"database\"; filename=\"malware.exe\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         not a database\r\n\
         --{boundary}--\r\n"
    );
    let request = Request::post("/api/database/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
