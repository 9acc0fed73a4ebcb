//! End-to-end tests of the HTTP routes through `tower::ServiceExt::oneshot`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use futures::StreamExt;
use tower::ServiceExt;

use lfv_kernel::{Config, Sandbox};
use lfv_server::{AppState, router};

/// root/
///   docs/
///     guide.md
///     chapter10.md
///     chapter2.md
///   .git/config
///   readme.txt
///   outside/
///     secret.txt
fn setup() -> (TempDir, Arc<AppState>, Router) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("root");
    std::fs::create_dir_all(root.join("docs")).unwrap();
    std::fs::create_dir_all(root.join(".git")).unwrap();
    std::fs::write(root.join(".git/config"), "[core]").unwrap();
    std::fs::write(root.join("docs/guide.md"), "# Guide\n\nhello world\n").unwrap();
    std::fs::write(root.join("docs/chapter10.md"), "ten").unwrap();
    std::fs::write(root.join("docs/chapter2.md"), "two").unwrap();
    std::fs::write(root.join("readme.txt"), "read me\n").unwrap();
    std::fs::create_dir_all(dir.path().join("outside")).unwrap();
    std::fs::write(dir.path().join("outside/secret.txt"), "secret").unwrap();

    let mut config = Config::default();
    // keep the search deterministic regardless of installed tools
    config.search.use_find = false;
    config.search.use_ripgrep = false;

    let sandbox = Arc::new(Sandbox::new(&root, None).unwrap());
    let state = Arc::new(AppState::from_sandbox(sandbox, &config));
    let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
    let app = router(Arc::clone(&state), &addr);
    (dir, state, app)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn names(node: &Value) -> Vec<&str> {
    node["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let (_dir, _state, app) = setup();
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_tree() {
    let (_dir, _state, app) = setup();
    let (status, json) = get_json(&app, "/api/tree?dir=.&depth=1").await;
    assert_eq!(status, StatusCode::OK);

    let files = &json["files"];
    assert_eq!(files["isDirectory"], true);
    assert_eq!(names(files), vec!["docs", "readme.txt"]);
    assert_eq!(
        names(&files["children"][0]),
        vec!["chapter2.md", "chapter10.md", "guide.md"]
    );

    let (status, json) = get_json(&app, "/api/tree?dir=.&depth=0").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["files"]["children"][0].get("children").is_none());
}

#[tokio::test]
async fn test_tree_rejections() {
    let (_dir, _state, app) = setup();

    let (status, json) = get_json(&app, "/api/tree?dir=.").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["code"], "missing_parameter");

    let (status, json) = get_json(&app, "/api/tree?dir=.&depth=deep").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "invalid_depth");

    let (status, json) = get_json(&app, "/api/tree?dir=../outside&depth=1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "out_of_bounds");
}

#[tokio::test]
async fn test_file_content() {
    let (_dir, _state, app) = setup();

    let (status, json) = get_json(&app, "/api/file-content?file=docs/guide.md").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["content"], "# Guide\n\nhello world\n");
    assert_eq!(json["stats"]["lines"], 3);
    assert_eq!(json["stats"]["words"], 4);
    assert_eq!(json["stats"]["chars"], 16);

    let (status, json) = get_json(&app, "/api/file-content?file=readme.txt&encoding=base64").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["content"], "cmVhZCBtZQo=");

    let (status, _) = get_json(&app, "/api/file-content").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get_json(&app, "/api/file-content?file=../outside/secret.txt").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "out_of_bounds");

    let (status, json) = get_json(&app, "/api/file-content?file=missing.md").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_serve_raw() {
    let (_dir, _state, app) = setup();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/serve/docs/chapter2.md").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/octet-stream"
    );
    let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&body[..], b"two");
}

#[tokio::test]
async fn test_rebase_keeps_caches() {
    let (_dir, state, app) = setup();
    let (status, _) = get_json(&app, "/api/tree?dir=.&depth=1").await;
    assert_eq!(status, StatusCode::OK);
    let root = state.sandbox.root().to_path_buf();

    let (status, json) = post_json(&app, "/api/new-base-dir", serde_json::json!({"dir": "docs"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "200");
    assert!(state.sandbox.base().ends_with("docs"));
    assert!(state.tree.is_walk_cached(&root, 1));

    // the walk taken before the rebase still answers, even after the disk moved on
    std::fs::write(root.join("late.txt"), "late").unwrap();
    let (status, json) = get_json(&app, "/api/tree?dir=..&depth=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&json["files"]), vec!["docs", "readme.txt"]);

    // relative paths now resolve from docs/
    let (status, json) = get_json(&app, "/api/file-content?file=chapter10.md").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["content"], "ten");

    let (status, _) = post_json(&app, "/api/new-base-dir", serde_json::json!({"dir": "../../outside"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post_json(&app, "/api/new-base-dir", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(state.sandbox.base().ends_with("docs"));
}

#[tokio::test]
async fn test_base_dir_completion() {
    let (_dir, state, app) = setup();
    let (status, json) = get_json(&app, "/api/new-base-dir-search?query=do").await;
    assert_eq!(status, StatusCode::OK);
    let files = json["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    let expected = state.sandbox.root().join("docs").display().to_string();
    assert!(files.iter().any(|f| f == &Value::String(expected.clone())));
    assert!(json["homedir"].is_string());

    let (status, json) = get_json(&app, "/api/new-base-dir-search?query=../../").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["files"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_file_search() {
    let (_dir, _state, app) = setup();

    let (status, json) = get_json(&app, "/api/file-search?q=CHAPTER&type=filename").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["searchStrategy"], "memory");
    assert_eq!(json["totalResults"], 2);
    let paths: Vec<_> = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["docs/chapter2.md", "docs/chapter10.md"]);

    // .git is never walked
    let (_, json) = get_json(&app, "/api/file-search?q=config&type=filename").await;
    assert_eq!(json["totalResults"], 0);

    let (status, _) = get_json(&app, "/api/file-search?type=filename").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, json) = get_json(&app, "/api/file-search?q=x&type=regex").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "invalid_search_type");
    let (status, _) = get_json(&app, "/api/file-search?q=x&type=filename&dir=../outside").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // no content strategy configured
    let (status, json) = get_json(&app, "/api/file-search?q=hello&type=content").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "search_exhausted");
}

#[tokio::test]
async fn test_file_watcher_is_event_stream() {
    let (_dir, _state, app) = setup();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/file-watcher").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
}

async fn next_frame(stream: &mut axum::body::BodyDataStream) -> String {
    let frame = tokio::time::timeout(std::time::Duration::from_secs(5), stream.next())
        .await
        .expect("no event within 5s")
        .unwrap()
        .unwrap();
    String::from_utf8(frame.to_vec()).unwrap()
}

#[tokio::test]
async fn test_cursor_moves_reach_viewers() {
    let (_dir, _state, app) = setup();
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/cursor-watcher").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    let mut events = response.into_body().into_data_stream();
    assert!(next_frame(&mut events).await.contains(r#"{"type":"connected"}"#));

    let (status, json) = post_json(
        &app,
        "/api/cursor-watcher",
        serde_json::json!({"file": "docs/guide.md", "line": 12}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let frame = next_frame(&mut events).await;
    assert!(
        frame.contains(r#"{"type":"cursor-changed","file":"docs/guide.md","line":12}"#),
        "{frame}"
    );
}

#[tokio::test]
async fn test_cursor_move_rejections() {
    let (_dir, _state, app) = setup();

    let (status, json) = post_json(&app, "/api/cursor-watcher", serde_json::json!({"line": 3})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "missing_parameter");

    let (status, json) = post_json(
        &app,
        "/api/cursor-watcher",
        serde_json::json!({"file": "a.md", "line": "three"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "invalid_line");
}

async fn allowed_origin(app: &Router, origin: &str) -> Option<String> {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/file-content?file=readme.txt")
                .header(header::ORIGIN, origin)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .map(|v| v.to_str().unwrap().to_string())
}

#[tokio::test]
async fn test_cors_allows_only_exact_loopback_hosts() {
    let (_dir, _state, app) = setup();

    assert_eq!(
        allowed_origin(&app, "http://localhost:5173").await.as_deref(),
        Some("http://localhost:5173")
    );
    assert_eq!(
        allowed_origin(&app, "http://127.0.0.1:3000").await.as_deref(),
        Some("http://127.0.0.1:3000")
    );
    assert_eq!(allowed_origin(&app, "http://localhost.attacker.example").await, None);
    assert_eq!(allowed_origin(&app, "http://127.0.0.1.evil.tld").await, None);
}
