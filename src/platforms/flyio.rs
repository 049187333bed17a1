use super::http::{self, ApiClient};
use super::{DeploymentState, DeploymentStatus, DeploymentSummary, HandlerConfig};
use crate::error::{PlatformError, PlatformResult};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const BASE_URL: &str = "https://api.fly.io/graphql";

/// Fly.io builds and releases machines through flyctl, not the API.
pub const DEPLOY_HINT: &str = "flyctl deploy";

const VIEWER_QUERY: &str = r#"
query {
  viewer {
    id
    email
    organizations { nodes { id slug name } }
  }
}"#;

const CREATE_APP: &str = r#"
mutation CreateApp($input: CreateAppInput!) {
  createApp(input: $input) { app { id name } }
}"#;

const SET_SECRETS: &str = r#"
mutation SetSecrets($input: SetSecretsInput!) {
  setSecrets(input: $input) { release { id version } }
}"#;

const APP_QUERY: &str = r#"
query GetApp($name: String!) {
  app(name: $name) { id name status hostname }
}"#;

const APPS_QUERY: &str = r#"
query Apps {
  apps { nodes { id name status hostname createdAt } }
}"#;

/// Fly.io GraphQL client.
#[derive(Debug)]
pub struct FlyioHandler {
    api: ApiClient,
    config: HandlerConfig,
    org_id: Option<String>,
    org_slug: Option<String>,
}

impl FlyioHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            api: ApiClient::new(BASE_URL, config.token.clone()),
            config,
            org_id: None,
            org_slug: None,
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

    pub fn org_slug(&self) -> Option<&str> {
        self.org_slug.as_deref()
    }

    pub async fn authenticate(&mut self) -> bool {
        match self.api.graphql(VIEWER_QUERY, None).await {
            Ok(data) if !data["viewer"].is_null() => {
                let first_org = data["viewer"]["organizations"]["nodes"]
                    .as_array()
                    .and_then(|orgs| orgs.first());
                if let Some(org) = first_org {
                    self.org_id = http::str_field(org, "/id");
                    self.org_slug = http::str_field(org, "/slug");
                }
                true
            }
            Ok(_) => false,
            Err(e) => {
                log::debug!("Fly.io authentication failed: {}", e);
                false
            }
        }
    }

    /// Creates the app and returns its name, which Fly uses as the id.
    pub async fn create_project(&mut self) -> PlatformResult<String> {
        let org_id = self.org_id.clone().ok_or_else(|| {
            PlatformError::Precondition(
                "Organization not found. Authenticate first or create an organization"
                    .to_string(),
            )
        })?;

        let variables = json!({
            "input": { "name": self.config.name, "organizationId": org_id }
        });
        let data = self
            .api
            .graphql(CREATE_APP, Some(variables))
            .await
            .map_err(|e| e.context("create Fly.io app"))?;

        http::str_field(&data, "/createApp/app/name")
            .or_else(|| http::str_field(&data, "/createApp/app/id"))
            .ok_or_else(|| {
                PlatformError::InvalidResponse("missing app data".to_string())
                    .context("create Fly.io app")
            })
    }

    pub async fn set_env_vars(
        &self,
        project_id: &str,
        envs: &BTreeMap<String, String>,
    ) -> PlatformResult<()> {
        let secrets: Vec<Value> = envs
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();
        let variables = json!({
            "input": { "appId": project_id, "secrets": secrets }
        });
        self.api
            .graphql(SET_SECRETS, Some(variables))
            .await
            .map_err(|e| e.context("set Fly.io secrets"))?;
        Ok(())
    }

    /// No API call; the caller shows [`DEPLOY_HINT`] instead.
    pub async fn trigger_deploy(&self, project_id: &str) -> PlatformResult<Option<String>> {
        log::info!(
            "Fly.io deploys run through flyctl: `{} -a {}`",
            DEPLOY_HINT,
            project_id
        );
        Ok(None)
    }

    pub async fn get_status(&self, project_id: &str) -> PlatformResult<DeploymentStatus> {
        let data = self
            .api
            .graphql(APP_QUERY, Some(json!({ "name": project_id })))
            .await?;
        let app = &data["app"];
        if app.is_null() {
            return Ok(DeploymentStatus::none());
        }

        let native = http::str_field(app, "/status").unwrap_or_else(|| "unknown".to_string());
        Ok(DeploymentStatus::new(
            native.clone(),
            map_state(&native),
            http::str_field(app, "/hostname").map(|h| http::https_url(&h)),
        ))
    }

    pub async fn get_url(&self, project_id: &str) -> PlatformResult<Option<String>> {
        Ok(self.get_status(project_id).await?.url)
    }

    pub async fn list_deployments(&self, limit: usize) -> Vec<DeploymentSummary> {
        let data = match self.api.graphql(APPS_QUERY, None).await {
            Ok(data) => data,
            Err(e) => {
                log::debug!("Listing Fly.io apps failed: {}", e);
                return Vec::new();
            }
        };

        data["apps"]["nodes"]
            .as_array()
            .map(|apps| {
                apps.iter()
                    .take(limit)
                    .map(|app| DeploymentSummary {
                        name: http::str_field(app, "/name").unwrap_or_else(|| "N/A".to_string()),
                        url: http::str_field(app, "/hostname").map(|h| http::https_url(&h)),
                        status: http::str_field(app, "/status")
                            .unwrap_or_else(|| "unknown".to_string())
                            .to_lowercase(),
                        created_at: http::str_field(app, "/createdAt").map(http::short_timestamp),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub fn map_state(native: &str) -> DeploymentState {
    match native.to_ascii_lowercase().as_str() {
        "pending" => DeploymentState::Pending,
        "deployed" | "running" => DeploymentState::Ready,
        "dead" | "failed" | "error" => DeploymentState::Error,
        _ => DeploymentState::Unknown,
    }
}
