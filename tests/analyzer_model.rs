use miniploy::analyzer::{analyze_project_with, AnalyzerSettings};
use miniploy::Platform;
use serde_json::json;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> AnalyzerSettings {
    AnalyzerSettings {
        api_key: Some("gsk_test".to_string()),
        model: "test-model".to_string(),
        base_url: server.uri(),
        timeout: Duration::from_secs(5),
    }
}

fn chat_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
    }))
}

fn express_project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("package.json"),
        r#"{"name":"shop","dependencies":{"express":"^4"}}"#,
    )
    .unwrap();
    fs::write(temp_dir.path().join("server.js"), "require('express')().listen(3000)").unwrap();
    temp_dir
}

#[tokio::test]
async fn test_model_suggestion_is_parsed() {
    let project = express_project();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer gsk_test"))
        .and(body_partial_json(json!({"model": "test-model", "max_tokens": 2000})))
        .and(body_string_contains("package.json"))
        .respond_with(chat_reply(
            r#"```json
{
  "framework": "express",
  "runtime": "node",
  "build_command": "",
  "start_command": "node server.js",
  "install_command": "npm install",
  "publish_dir": ".",
  "env_vars_needed": ["PORT"],
  "summary": "Express API server",
  "confidence": 0.88,
  "platform_recommendations": {
    "render": {"score": 0.9, "reason": "Long-running Node server"},
    "vercel": {"score": 0.4, "reason": "Serverless only"}
  }
}
```"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let result = analyze_project_with(project.path(), &settings(&server)).await;

    assert_eq!(result.framework, "express");
    assert_eq!(result.runtime, "node");
    assert_eq!(result.start_command, "node server.js");
    assert_eq!(result.env_vars_needed, vec!["PORT".to_string()]);
    assert!((result.confidence - 0.88).abs() < 1e-6);
    assert_eq!(result.top_platform(), Some(Platform::Render));
    assert!(result.dockerfile.is_none());
}

#[tokio::test]
async fn test_dockerfile_forces_docker_runtime() {
    let project = express_project();
    fs::write(project.path().join("Dockerfile"), "FROM node:20\nCMD node server.js").unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(chat_reply(
            r#"{"framework":"express","runtime":"node","summary":"Express API.","confidence":0.7}"#,
        ))
        .mount(&server)
        .await;

    let result = analyze_project_with(project.path(), &settings(&server)).await;

    assert_eq!(result.runtime, "docker");
    assert_eq!(result.dockerfile.as_deref(), Some("Dockerfile"));
    assert!(result.summary.ends_with("Dockerfile detected."));
}

#[tokio::test]
async fn test_malformed_answer_is_zero_confidence() {
    let project = express_project();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(chat_reply("I think this is probably an Express app."))
        .mount(&server)
        .await;

    let result = analyze_project_with(project.path(), &settings(&server)).await;

    assert_eq!(result.confidence, 0.0);
    assert_eq!(result.framework, "unknown");
    assert!(result.summary.starts_with("AI response parsing error"));
}

#[tokio::test]
async fn test_api_error_is_zero_confidence() {
    let project = express_project();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({"error": {"message": "Rate limit reached"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = analyze_project_with(project.path(), &settings(&server)).await;

    assert_eq!(result.confidence, 0.0);
    assert!(result.summary.starts_with("Analysis error"));
    assert!(result.summary.contains("Rate limit reached"));
}

#[tokio::test]
async fn test_static_site_never_calls_model() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("index.html"), "<h1>hello</h1>").unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(chat_reply("{}"))
        .expect(0)
        .mount(&server)
        .await;

    let result = analyze_project_with(temp_dir.path(), &settings(&server)).await;
    assert_eq!(result.framework, "static");
    assert_eq!(result.publish_dir, ".");
}
