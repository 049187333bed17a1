use miniploy::common::file_utils::collect_site_files;
use miniploy::error::PlatformError;
use miniploy::platforms::{
    monitor_deployment, DeploymentState, HandlerConfig, NetlifyHandler, Platform,
    PlatformHandler, PollOutcome, PollPolicy,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn handler(platform: Platform, server: &MockServer) -> PlatformHandler {
    let mut config = HandlerConfig::new("test_token");
    config.name = "shop".to_string();
    PlatformHandler::new(platform, config).with_base_url(server.uri())
}

fn fast_poll(max_attempts: u32) -> PollPolicy {
    PollPolicy::new(Duration::from_millis(5), max_attempts)
}

#[tokio::test]
async fn test_authenticate_is_false_on_unauthorized() {
    for platform in [Platform::Vercel, Platform::Netlify, Platform::Render] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthorized"})))
            .mount(&server)
            .await;

        let mut handler = handler(platform, &server);
        assert!(!handler.authenticate().await, "{} accepted a bad token", platform);
        assert!(handler.identity().is_none());
    }
}

#[tokio::test]
async fn test_authenticate_is_false_on_graphql_error() {
    for platform in [Platform::Railway, Platform::Flyio] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"errors": [{"message": "Not Authorized"}], "data": null})),
            )
            .mount(&server)
            .await;

        let mut handler = handler(platform, &server);
        assert!(!handler.authenticate().await, "{} accepted a bad token", platform);
    }
}

#[tokio::test]
async fn test_graphql_authenticate_is_false_on_unauthorized_status() {
    for platform in [Platform::Railway, Platform::Flyio] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"errors": [{"message": "Unauthorized"}]})),
            )
            .mount(&server)
            .await;

        let mut handler = handler(platform, &server);
        assert!(!handler.authenticate().await, "{} accepted a bad token", platform);
        assert!(handler.identity().is_none());
    }
}

#[tokio::test]
async fn test_vercel_authenticate_and_create() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/user"))
        .and(header("Authorization", "Bearer test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"user": {"username": "ada"}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v9/projects"))
        .and(body_partial_json(json!({"name": "shop", "framework": "nextjs"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "prj_123", "name": "shop"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut handler = handler(Platform::Vercel, &server);
    handler.config_mut().framework = Some("Next.js".to_string());

    assert!(handler.authenticate().await);
    assert_eq!(handler.identity(), Some("ada"));
    assert_eq!(handler.create_project().await.unwrap(), "prj_123");
}

#[tokio::test]
async fn test_vercel_api_error_carries_platform_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v9/projects"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({"error": {"code": "conflict", "message": "Project already exists"}})),
        )
        .mount(&server)
        .await;

    let mut handler = handler(Platform::Vercel, &server);
    let err = handler.create_project().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to create Vercel project: 409 - Project already exists"
    );
}

#[tokio::test]
async fn test_vercel_status_and_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v6/deployments"))
        .and(query_param("projectId", "prj_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deployments": [{"uid": "dpl_1", "readyState": "BUILDING", "url": "shop-abc.vercel.app"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v6/deployments"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deployments": [
                {"name": "shop", "url": "shop-abc.vercel.app", "readyState": "READY", "createdAt": 1_700_000_000_000i64},
                {"name": "blog", "readyState": "ERROR"}
            ]
        })))
        .mount(&server)
        .await;

    let handler = handler(Platform::Vercel, &server);

    let status = handler.get_status("prj_123").await.unwrap();
    assert_eq!(status.native, "BUILDING");
    assert_eq!(status.state, DeploymentState::Building);
    assert_eq!(status.url.as_deref(), Some("https://shop-abc.vercel.app"));

    let listed = handler.list_deployments(10).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].name, "shop");
    assert_eq!(listed[1].url, None);
}

#[tokio::test]
async fn test_list_deployments_is_empty_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    for platform in [Platform::Vercel, Platform::Netlify, Platform::Render] {
        assert!(handler(platform, &server).list_deployments(10).await.is_empty());
    }
}

#[tokio::test]
async fn test_empty_env_map_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let handler = handler(Platform::Render, &server);
    handler.set_env_vars("srv-1", &BTreeMap::new()).await.unwrap();
}

#[tokio::test]
async fn test_render_create_web_service() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/owners"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"owner": {"id": "own-1", "name": "Ada"}, "cursor": "c1"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/services"))
        .and(body_partial_json(json!({
            "type": "web_service",
            "ownerId": "own-1",
            "repo": "https://github.com/acme/shop",
            "autoDeploy": "no",
            "serviceDetails": {
                "runtime": "docker",
                "region": "oregon",
                "plan": "free",
                "envSpecificDetails": {"dockerfilePath": "./Dockerfile"}
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "service": {"id": "srv-42"}, "deployId": "dep-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut handler = handler(Platform::Render, &server);
    handler.config_mut().runtime = Some("docker".to_string());
    handler.config_mut().dockerfile = Some("Dockerfile".to_string());
    handler.config_mut().repo_url = Some("https://github.com/acme/shop".to_string());

    assert!(handler.authenticate().await);
    assert_eq!(handler.identity(), Some("own-1"));
    assert_eq!(handler.create_project().await.unwrap(), "srv-42");
}

#[tokio::test]
async fn test_render_create_requires_repository() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/owners"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"owner": {"id": "own-1"}}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/services"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let mut handler = handler(Platform::Render, &server);
    assert!(handler.authenticate().await);
    let err = handler.create_project().await.unwrap_err();
    assert!(err.to_string().contains("repo_url"));
}

#[tokio::test]
async fn test_render_env_vars_and_url() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/services/srv-42/env-vars"))
        .and(body_partial_json(json!([{"key": "DATABASE_URL", "value": "postgres://db"}])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/srv-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "srv-42",
            "serviceDetails": {"url": "https://shop.onrender.com"}
        })))
        .mount(&server)
        .await;

    let handler = handler(Platform::Render, &server);
    let mut envs = BTreeMap::new();
    envs.insert("DATABASE_URL".to_string(), "postgres://db".to_string());

    handler.set_env_vars("srv-42", &envs).await.unwrap();
    assert_eq!(
        handler.get_url("srv-42").await.unwrap().as_deref(),
        Some("https://shop.onrender.com")
    );
}

#[tokio::test]
async fn test_monitor_stops_at_ceiling_against_live_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/srv-42/deploys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"deploy": {"id": "dep-1", "status": "build_in_progress"}, "cursor": "c"}
        ])))
        .expect(4)
        .mount(&server)
        .await;

    let handler = handler(Platform::Render, &server);
    let mut ticks = 0;
    let outcome = monitor_deployment(&handler, "srv-42", fast_poll(4), |_, _| ticks += 1).await;

    assert_eq!(ticks, 4);
    match outcome {
        PollOutcome::TimedOut(Some(last)) => {
            assert_eq!(last.native, "build_in_progress");
            assert_eq!(last.state, DeploymentState::Building);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_monitor_finishes_on_live() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/services/srv-42/deploys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"deploy": {"id": "dep-1", "status": "live"}}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let handler = handler(Platform::Render, &server);
    let outcome = monitor_deployment(&handler, "srv-42", fast_poll(30), |_, _| {}).await;
    assert!(matches!(
        outcome,
        PollOutcome::Finished(ref status) if status.state == DeploymentState::Ready
    ));
}

#[tokio::test]
async fn test_monitor_is_interrupted_by_failed_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let handler = handler(Platform::Netlify, &server);
    let outcome = monitor_deployment(&handler, "site-1", fast_poll(5), |_, _| {}).await;
    match outcome {
        PollOutcome::Interrupted(PlatformError::Api { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected interruption, got {:?}", other),
    }
}

#[tokio::test]
async fn test_netlify_env_vars_go_through_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sites/site-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "site-1", "account_slug": "acme"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/acme/env"))
        .and(query_param("site_id", "site-1"))
        .and(body_partial_json(json!([
            {"key": "API_KEY", "values": [{"value": "secret", "context": "all"}]}
        ])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let handler = handler(Platform::Netlify, &server);
    let mut envs = BTreeMap::new();
    envs.insert("API_KEY".to_string(), "secret".to_string());
    handler.set_env_vars("site-1", &envs).await.unwrap();
}

#[tokio::test]
async fn test_netlify_static_deploy_waits_until_ready() {
    let site_dir = TempDir::new().unwrap();
    fs::write(site_dir.path().join("index.html"), "<h1>hello</h1>").unwrap();
    fs::write(site_dir.path().join("app.css"), "h1 { color: red }").unwrap();
    let files = collect_site_files(site_dir.path()).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sites"))
        .and(body_string_contains("landing-"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "site-1",
            "ssl_url": "https://landing-x1y2z3.netlify.app",
            "admin_url": "https://app.netlify.com/sites/landing-x1y2z3"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sites/site-1/deploys"))
        .and(header("Content-Type", "application/zip"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "dep-1", "state": "uploaded"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites/site-1/deploys/dep-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "dep-1", "state": "ready"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites/site-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "site-1",
            "ssl_url": "https://landing-x1y2z3.netlify.app",
            "admin_url": "https://app.netlify.com/sites/landing-x1y2z3"
        })))
        .mount(&server)
        .await;

    let netlify = NetlifyHandler::new(HandlerConfig::new("test_token"))
        .with_base_url(server.uri())
        .with_upload_poll(fast_poll(3));
    let handler = PlatformHandler::Netlify(netlify);

    let deployment = handler.deploy_static_files("landing", &files).await.unwrap();
    assert_eq!(deployment.id, "dep-1");
    assert_eq!(deployment.site_id.as_deref(), Some("site-1"));
    assert_eq!(deployment.status, "ready");
    assert_eq!(
        deployment.url.as_deref(),
        Some("https://landing-x1y2z3.netlify.app")
    );
}

#[tokio::test]
async fn test_netlify_static_deploy_reports_build_error() {
    let site_dir = TempDir::new().unwrap();
    fs::write(site_dir.path().join("index.html"), "<h1>hello</h1>").unwrap();
    let files = collect_site_files(site_dir.path()).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sites"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "site-1"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sites/site-1/deploys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "dep-1"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sites/site-1/deploys/dep-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": "error", "error_message": "Invalid archive"
        })))
        .mount(&server)
        .await;

    let netlify = NetlifyHandler::new(HandlerConfig::new("test_token"))
        .with_base_url(server.uri())
        .with_upload_poll(fast_poll(3));
    let err = PlatformHandler::Netlify(netlify)
        .deploy_static_files("landing", &files)
        .await
        .unwrap_err();
    assert!(matches!(err, PlatformError::DeployFailed(ref reason) if reason == "Invalid archive"));
}

#[tokio::test]
async fn test_static_deploy_unsupported_platform() {
    let server = MockServer::start().await;
    let err = handler(Platform::Railway, &server)
        .deploy_static_files("site", &[])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Railway does not support static file deployment");
}

#[tokio::test]
async fn test_railway_url_falls_back_to_dashboard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("LatestDeployment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"deployments": {"edges": []}}
        })))
        .mount(&server)
        .await;

    let handler = handler(Platform::Railway, &server);
    let status = handler.get_status("prj-1").await.unwrap();
    assert_eq!(status.native, "NONE");
    assert_eq!(status.state, DeploymentState::Unknown);
    assert_eq!(
        handler.get_url("prj-1").await.unwrap().as_deref(),
        Some("https://railway.app/project/prj-1")
    );
}

#[tokio::test]
async fn test_railway_authenticate_and_create() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("teams"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"me": {"id": "u1", "teams": {"edges": [{"node": {"id": "team-9", "name": "acme"}}]}}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("ProjectCreate"))
        .and(body_partial_json(json!({"variables": {"input": {"name": "shop", "teamId": "team-9"}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"projectCreate": {"id": "prj-7", "name": "shop"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut handler = handler(Platform::Railway, &server);
    assert!(handler.authenticate().await);
    assert_eq!(handler.identity(), Some("team-9"));
    assert_eq!(handler.create_project().await.unwrap(), "prj-7");
}

#[tokio::test]
async fn test_flyio_status_and_deploy_hint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("GetApp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"app": {"id": "a1", "name": "shop", "status": "deployed", "hostname": "shop.fly.dev"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handler = handler(Platform::Flyio, &server);
    assert_eq!(handler.trigger_deploy("shop").await.unwrap(), None);
    assert_eq!(handler.deploy_hint(), Some("flyctl deploy"));

    let status = handler.get_status("shop").await.unwrap();
    assert_eq!(status.state, DeploymentState::Ready);
    assert_eq!(status.url.as_deref(), Some("https://shop.fly.dev"));
}
