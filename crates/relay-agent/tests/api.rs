use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use relay_agent::build_agent;
use relay_agent::config::AppConfig;
use relay_agent::server::router;
use relay_agent_test_model::{
    PresetResponse, TestEmbeddingProvider, TestModelProvider,
};
use serde_json::{Value, json};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    model_provider: TestModelProvider,
    _root: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("hello.txt"), "hello from disk").unwrap();

    let mut config = AppConfig::default();
    config.tools.allow_root = root.path().to_owned();
    let model_provider = TestModelProvider::default();
    let agent = build_agent(
        &config,
        model_provider.clone(),
        Arc::new(TestEmbeddingProvider::default()),
    )
    .unwrap();
    TestApp {
        router: router(Arc::new(agent)),
        model_provider,
        _root: root,
    }
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_owned())))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(router, "POST", uri, Some(&body.to_string())).await
}

#[tokio::test]
async fn test_health() {
    let app = test_app();
    let (status, body) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_list_tools() {
    let app = test_app();
    let (status, body) = send(&app.router, "GET", "/api/tools", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    let names: Vec<_> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, ["list_directory", "read_file", "write_file"]);
    assert_eq!(body["tools"][0]["source"], "local");
}

#[tokio::test]
async fn test_chat_with_file_tool() {
    let app = test_app();
    app.model_provider.add_response(PresetResponse::tool_call(
        "call_0",
        "read_file",
        json!({ "path": "hello.txt" }),
    ));
    app.model_provider
        .add_response(PresetResponse::text("The file says hello."));

    let (status, body) =
        post(&app.router, "/api/chat", json!({ "message": "read it" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "The file says hello.");
    assert_eq!(body["tool_calls"][0]["tool"], "read_file");
    assert_eq!(body["tool_calls"][0]["result"], "hello from disk");
    let conversation_id = body["conversation_id"].as_str().unwrap();
    assert!(!conversation_id.is_empty());

    // The system prompt leads every request.
    let requests = app.model_provider.requests();
    assert!(requests[0].messages[0].content().starts_with("你是"));
}

#[tokio::test]
async fn test_chat_failure() {
    let app = test_app();
    let (status, body) =
        post(&app.router, "/api/chat", json!({ "message": "hi" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("model request failed"));
}

#[tokio::test]
async fn test_bad_requests() {
    let app = test_app();
    let cases = [
        ("/api/chat", json!({ "conversation_id": "c1" })),
        ("/api/chat/rag", json!({ "message": 42 })),
        ("/api/rag/add", json!({ "content": "text" })),
        ("/api/rag/add", json!({ "id": "doc" })),
        ("/api/rag/search", json!({ "query": "" })),
        ("/api/rag/import", json!({})),
    ];
    for (uri, body) in cases {
        let (status, _) = post(&app.router, uri, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
    }

    let (status, body) =
        send(&app.router, "POST", "/api/chat", Some("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("invalid request body"));
    assert!(app.model_provider.requests().is_empty());
}

#[tokio::test]
async fn test_add_and_search() {
    let app = test_app();
    let (status, body) = post(
        &app.router,
        "/api/rag/add",
        json!({
            "id": "router",
            "content": "Restart the router to fix the connection.",
            "metadata": { "source": "faq" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "document_count": 1 }));

    let (_, body) = post(
        &app.router,
        "/api/rag/add",
        json!({ "id": "manual", "chunks": ["Step one.", "Step two."] }),
    )
    .await;
    assert_eq!(body["document_count"], 3);

    let (status, body) = post(
        &app.router,
        "/api/rag/search",
        json!({ "query": "Restart the router" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["results"][0]["id"], "router_chunk_0");
    assert_eq!(body["results"][0]["metadata"]["source"], "faq");
    assert!(body["results"][1].get("metadata").is_none());
}

#[tokio::test]
async fn test_import_and_chat_with_retrieval() {
    let app = test_app();
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(docs.path().join("vpn.md"), "Use the VPN for remote access.")
        .unwrap();
    std::fs::write(docs.path().join("skip.txt"), "Not imported.").unwrap();

    let (status, body) = post(
        &app.router,
        "/api/rag/import",
        json!({ "dir": docs.path() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document_count"], 1);

    app.model_provider.add_response(PresetResponse::text("Use the VPN."));
    let (status, body) = post(
        &app.router,
        "/api/chat/rag",
        json!({ "message": "How do I work remotely?" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Use the VPN.");
    assert!(body.get("tool_calls").is_none());

    let requests = app.model_provider.requests();
    let user = requests[0].messages[1].content();
    assert!(user.contains("Use the VPN for remote access."));
    assert!(user.ends_with("用户问题 / Question: How do I work remotely?"));
}

#[tokio::test]
async fn test_import_missing_directory() {
    let app = test_app();
    let (status, body) = post(
        &app.router,
        "/api/rag/import",
        json!({ "dir": "/nonexistent/relay-agent-docs" }),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}
