use super::http::{self, ApiClient};
use super::{non_empty, DeploymentState, DeploymentStatus, DeploymentSummary, HandlerConfig};
use crate::error::{PlatformError, PlatformResult};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const BASE_URL: &str = "https://api.render.com/v1";

const REGION: &str = "oregon";
const PLAN: &str = "free";

/// Render REST API client.
#[derive(Debug)]
pub struct RenderHandler {
    api: ApiClient,
    config: HandlerConfig,
    owner_id: Option<String>,
}

impl RenderHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            api: ApiClient::new(BASE_URL, config.token.clone()),
            config,
            owner_id: None,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut HandlerConfig {
        &mut self.config
    }

    pub(crate) fn api_mut(&mut self) -> &mut ApiClient {
        &mut self.api
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Checks the token and remembers the first owner (user or team).
    pub async fn authenticate(&mut self) -> bool {
        match self.api.get_json("/owners", &[]).await {
            Ok(body) => {
                self.owner_id = body
                    .as_array()
                    .and_then(|owners| owners.first())
                    .and_then(|first| http::str_field(unwrap_entry(first, "owner"), "/id"));
                log::debug!("Render owner: {:?}", self.owner_id);
                true
            }
            Err(e) => {
                log::debug!("Render authentication failed: {}", e);
                false
            }
        }
    }

    pub async fn create_project(&mut self) -> PlatformResult<String> {
        let payload = self
            .service_payload()
            .map_err(|e| e.context("create Render service"))?;
        log::debug!("Creating Render {}", payload["type"]);

        let body = self
            .api
            .post_json("/services", &[], &payload)
            .await
            .map_err(|e| e.context("create Render service"))?;

        http::str_field(unwrap_entry(&body, "service"), "/id").ok_or_else(|| {
            PlatformError::InvalidResponse("missing service id".to_string())
                .context("create Render service")
        })
    }

    /// Service creation body: a static site for `static` runtimes, a web
    /// service otherwise.
    fn service_payload(&self) -> PlatformResult<Value> {
        let owner_id = self.owner_id.as_deref().ok_or_else(|| {
            PlatformError::Precondition("Owner ID not found. Authenticate first".to_string())
        })?;
        let name = self.config.name.trim();
        if name.is_empty() {
            return Err(PlatformError::Precondition(
                "Project name is required".to_string(),
            ));
        }
        let repo = non_empty(&self.config.repo_url).ok_or_else(|| {
            PlatformError::Precondition(
                "Render services are built from a Git repository; repo_url is required"
                    .to_string(),
            )
        })?;

        let runtime = non_empty(&self.config.runtime).unwrap_or(
            if non_empty(&self.config.dockerfile).is_some() {
                "docker"
            } else {
                "static"
            },
        );

        let mut payload = json!({
            "name": name,
            "ownerId": owner_id,
            "repo": repo,
            "branch": non_empty(&self.config.branch).unwrap_or("main"),
            "autoDeploy": "no",
        });

        if runtime.eq_ignore_ascii_case("static") {
            let mut details = json!({
                "publishPath": non_empty(&self.config.publish_dir).unwrap_or("."),
            });
            if let Some(build) = non_empty(&self.config.build_command) {
                details["buildCommand"] = json!(build);
            }
            payload["type"] = json!("static_site");
            payload["serviceDetails"] = details;
            return Ok(payload);
        }

        let render_runtime = service_runtime(runtime);
        let env_details = if render_runtime == "docker" {
            json!({
                "dockerfilePath": format!(
                    "./{}",
                    non_empty(&self.config.dockerfile).unwrap_or("Dockerfile")
                ),
            })
        } else {
            json!({
                "buildCommand": non_empty(&self.config.build_command).unwrap_or_default(),
                "startCommand": non_empty(&self.config.start_command).unwrap_or_default(),
            })
        };

        payload["type"] = json!("web_service");
        payload["serviceDetails"] = json!({
            "runtime": render_runtime,
            "plan": PLAN,
            "region": REGION,
            "envSpecificDetails": env_details,
        });
        Ok(payload)
    }

    pub async fn set_env_vars(
        &self,
        project_id: &str,
        envs: &BTreeMap<String, String>,
    ) -> PlatformResult<()> {
        let vars: Vec<Value> = envs
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();
        self.api
            .put_json(
                &format!("/services/{}/env-vars", project_id),
                &Value::Array(vars),
            )
            .await
            .map_err(|e| e.context("set Render variables"))?;
        Ok(())
    }

    pub async fn trigger_deploy(&self, project_id: &str) -> PlatformResult<Option<String>> {
        let body = self
            .api
            .post_json(
                &format!("/services/{}/deploys", project_id),
                &[],
                &json!({ "clearCache": "do_not_clear" }),
            )
            .await
            .map_err(|e| e.context("trigger Render deploy"))?;
        Ok(http::str_field(unwrap_entry(&body, "deploy"), "/id"))
    }

    pub async fn get_status(&self, project_id: &str) -> PlatformResult<DeploymentStatus> {
        let body = self
            .api
            .get_json(
                &format!("/services/{}/deploys", project_id),
                &[("limit", "1".to_string())],
            )
            .await?;
        let Some(latest) = body.as_array().and_then(|d| d.first()) else {
            return Ok(DeploymentStatus::none());
        };

        let native = http::str_field(unwrap_entry(latest, "deploy"), "/status")
            .unwrap_or_else(|| "unknown".to_string());
        Ok(DeploymentStatus::new(native.clone(), map_state(&native), None))
    }

    pub async fn get_url(&self, project_id: &str) -> PlatformResult<Option<String>> {
        let body = self
            .api
            .get_json(&format!("/services/{}", project_id), &[])
            .await?;
        Ok(http::str_field(unwrap_entry(&body, "service"), "/serviceDetails/url"))
    }

    pub async fn list_deployments(&self, limit: usize) -> Vec<DeploymentSummary> {
        let body = match self
            .api
            .get_json("/services", &[("limit", limit.to_string())])
            .await
        {
            Ok(body) => body,
            Err(e) => {
                log::debug!("Listing Render services failed: {}", e);
                return Vec::new();
            }
        };

        let services = body
            .as_array()
            .or_else(|| body["services"].as_array())
            .cloned()
            .unwrap_or_default();
        services
            .iter()
            .take(limit)
            .map(|entry| summarize(unwrap_entry(entry, "service")))
            .collect()
    }
}

/// List endpoints wrap each item as `{"<key>": {...}, "cursor": ...}`.
fn unwrap_entry<'a>(value: &'a Value, key: &str) -> &'a Value {
    match value.get(key) {
        Some(inner) if inner.is_object() => inner,
        _ => value,
    }
}

fn service_runtime(runtime: &str) -> &'static str {
    match runtime.to_ascii_lowercase().as_str() {
        "node" => "node",
        "python" => "python",
        "go" => "go",
        "ruby" => "ruby",
        _ => "docker",
    }
}

fn summarize(service: &Value) -> DeploymentSummary {
    let suspended = http::str_field(service, "/suspended");
    DeploymentSummary {
        name: http::str_field(service, "/name").unwrap_or_else(|| "N/A".to_string()),
        url: http::str_field(service, "/serviceDetails/url"),
        status: match suspended.as_deref() {
            Some("not_suspended") => "active",
            _ => "inactive",
        }
        .to_string(),
        created_at: http::str_field(service, "/createdAt").map(http::short_timestamp),
    }
}

pub fn map_state(native: &str) -> DeploymentState {
    match native.to_ascii_lowercase().as_str() {
        "created" | "queued" => DeploymentState::Pending,
        "build_in_progress" | "update_in_progress" | "pre_deploy_in_progress" => {
            DeploymentState::Building
        }
        "live" => DeploymentState::Ready,
        "build_failed" | "update_failed" | "pre_deploy_failed" | "canceled" | "deactivated" => {
            DeploymentState::Error
        }
        _ => DeploymentState::Unknown,
    }
}
