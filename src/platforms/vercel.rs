use super::http::{self, ApiClient, UPLOAD_TIMEOUT};
use super::{
    non_empty, DeploymentState, DeploymentStatus, DeploymentSummary, HandlerConfig,
    StaticDeployment,
};
use crate::common::file_utils::SiteFile;
use crate::common::git;
use crate::error::{PlatformError, PlatformResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const BASE_URL: &str = "https://api.vercel.com";

/// Vercel REST API client.
#[derive(Debug)]
pub struct VercelHandler {
    api: ApiClient,
    config: HandlerConfig,
    username: Option<String>,
}

impl VercelHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            api: ApiClient::new(BASE_URL, config.token.clone()),
            config,
            username: None,
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

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Team scope added to every request when configured.
    fn scope(&self) -> Vec<(&'static str, String)> {
        non_empty(&self.config.team_id)
            .map(|team| vec![("teamId", team.to_string())])
            .unwrap_or_default()
    }

    pub async fn authenticate(&mut self) -> bool {
        match self.api.get_json("/v2/user", &self.scope()).await {
            Ok(body) => {
                self.username = http::str_field(&body, "/user/username");
                log::debug!("Authenticated with Vercel as {:?}", self.username);
                true
            }
            Err(e) => {
                log::debug!("Vercel authentication failed: {}", e);
                false
            }
        }
    }

    pub async fn create_project(&mut self) -> PlatformResult<String> {
        let mut payload = json!({ "name": self.config.name });
        if let Some(slug) = non_empty(&self.config.framework).and_then(framework_slug) {
            payload["framework"] = json!(slug);
        }

        let body = self
            .api
            .post_json("/v9/projects", &self.scope(), &payload)
            .await
            .map_err(|e| e.context("create Vercel project"))?;

        http::str_field(&body, "/id")
            .or_else(|| http::str_field(&body, "/name"))
            .ok_or_else(|| {
                PlatformError::InvalidResponse("missing project id".to_string())
                    .context("create Vercel project")
            })
    }

    pub async fn set_env_vars(
        &self,
        project_id: &str,
        envs: &BTreeMap<String, String>,
    ) -> PlatformResult<()> {
        let path = format!("/v10/projects/{}/env", project_id);
        for (key, value) in envs {
            let payload = json!({
                "key": key,
                "value": value,
                "type": "encrypted",
                "target": ["production", "preview", "development"],
            });
            self.api
                .post_json(&path, &self.scope(), &payload)
                .await
                .map_err(|e| e.context(format!("set Vercel variable {}", key)))?;
        }
        Ok(())
    }

    /// Vercel can only build from a connected Git repository.
    pub async fn trigger_deploy(&self, project_id: &str) -> PlatformResult<Option<String>> {
        let repo_url = non_empty(&self.config.repo_url).ok_or_else(|| {
            PlatformError::Precondition(
                "Vercel deployments need a GitHub repository (repo_url in miniploy.yaml)"
                    .to_string(),
            )
        })?;
        let (org, repo) = git::github_slug(repo_url).ok_or_else(|| {
            PlatformError::Precondition(format!(
                "Vercel deployments need a GitHub repository, got {}",
                repo_url
            ))
        })?;
        let git_ref = non_empty(&self.config.branch).unwrap_or("main");

        let name = if self.config.name.is_empty() {
            project_id
        } else {
            self.config.name.as_str()
        };
        let payload = json!({
            "name": name,
            "project": project_id,
            "target": "production",
            "gitSource": {
                "type": "github",
                "org": org,
                "repo": repo,
                "ref": git_ref,
            },
        });

        let body = self
            .api
            .post_json("/v13/deployments", &self.scope(), &payload)
            .await
            .map_err(|e| e.context("trigger Vercel deployment"))?;
        Ok(http::str_field(&body, "/id"))
    }

    pub async fn get_status(&self, project_id: &str) -> PlatformResult<DeploymentStatus> {
        let mut query = self.scope();
        query.push(("projectId", project_id.to_string()));
        query.push(("limit", "1".to_string()));

        let body = self.api.get_json("/v6/deployments", &query).await?;
        let Some(latest) = body["deployments"].as_array().and_then(|d| d.first()) else {
            return Ok(DeploymentStatus::none());
        };

        let native = http::str_field(latest, "/readyState").unwrap_or_else(|| "UNKNOWN".to_string());
        Ok(DeploymentStatus::new(
            native.clone(),
            map_state(&native),
            http::str_field(latest, "/url").map(|u| http::https_url(&u)),
        ))
    }

    pub async fn get_url(&self, project_id: &str) -> PlatformResult<Option<String>> {
        Ok(self.get_status(project_id).await?.url)
    }

    pub async fn list_deployments(&self, limit: usize) -> Vec<DeploymentSummary> {
        let mut query = self.scope();
        query.push(("limit", limit.to_string()));

        let body = match self.api.get_json("/v6/deployments", &query).await {
            Ok(body) => body,
            Err(e) => {
                log::debug!("Listing Vercel deployments failed: {}", e);
                return Vec::new();
            }
        };

        body["deployments"]
            .as_array()
            .map(|deployments| deployments.iter().map(summarize).collect())
            .unwrap_or_default()
    }

    /// Upload every file inline (base64) as a single deployment.
    pub async fn deploy_static_files(
        &self,
        name: &str,
        files: &[SiteFile],
    ) -> PlatformResult<StaticDeployment> {
        if files.is_empty() {
            return Err(PlatformError::Precondition(
                "No files found to deploy".to_string(),
            ));
        }

        let mut inline = Vec::with_capacity(files.len());
        for file in files {
            let content = std::fs::read(&file.absolute)?;
            inline.push(json!({
                "file": file.relative,
                "data": STANDARD.encode(content),
                "encoding": "base64",
            }));
        }
        log::debug!("Uploading {} files to Vercel", inline.len());

        let payload = json!({
            "name": name,
            "files": inline,
            "target": "production",
            "projectSettings": { "framework": null },
        });
        let request = self
            .api
            .request(Method::POST, "/v13/deployments", UPLOAD_TIMEOUT)
            .query(&self.scope())
            .json(&payload);
        let body = self
            .api
            .send(request)
            .await
            .map_err(|e| e.context("deploy to Vercel"))?;

        let id = http::str_field(&body, "/id").ok_or_else(|| {
            PlatformError::InvalidResponse("missing deployment id".to_string())
                .context("deploy to Vercel")
        })?;
        Ok(StaticDeployment {
            id,
            site_id: http::str_field(&body, "/projectId"),
            url: http::str_field(&body, "/url").map(|u| http::https_url(&u)),
            status: http::str_field(&body, "/readyState").unwrap_or_else(|| "BUILDING".to_string()),
            dashboard_url: http::str_field(&body, "/inspectorUrl"),
        })
    }
}

fn summarize(deployment: &Value) -> DeploymentSummary {
    DeploymentSummary {
        name: http::str_field(deployment, "/name").unwrap_or_else(|| "N/A".to_string()),
        url: http::str_field(deployment, "/url").map(|u| http::https_url(&u)),
        status: http::str_field(deployment, "/readyState")
            .or_else(|| http::str_field(deployment, "/state"))
            .unwrap_or_else(|| "UNKNOWN".to_string()),
        created_at: deployment["createdAt"]
            .as_i64()
            .and_then(chrono::DateTime::from_timestamp_millis)
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string()),
    }
}

/// Framework slug Vercel understands, if any.
fn framework_slug(framework: &str) -> Option<&'static str> {
    match framework.to_ascii_lowercase().as_str() {
        "nextjs" | "next" | "next.js" => Some("nextjs"),
        "react" | "create-react-app" => Some("create-react-app"),
        "vite" => Some("vite"),
        "vue" | "vuejs" => Some("vue"),
        "nuxt" | "nuxtjs" => Some("nuxtjs"),
        "angular" => Some("angular"),
        "svelte" | "sveltekit" => Some("sveltekit"),
        "gatsby" => Some("gatsby"),
        "astro" => Some("astro"),
        "remix" => Some("remix"),
        _ => None,
    }
}

pub fn map_state(native: &str) -> DeploymentState {
    match native.to_ascii_uppercase().as_str() {
        "QUEUED" | "INITIALIZING" => DeploymentState::Pending,
        "BUILDING" => DeploymentState::Building,
        "READY" => DeploymentState::Ready,
        "ERROR" | "CANCELED" => DeploymentState::Error,
        _ => DeploymentState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mapping() {
        assert_eq!(map_state("QUEUED"), DeploymentState::Pending);
        assert_eq!(map_state("INITIALIZING"), DeploymentState::Pending);
        assert_eq!(map_state("BUILDING"), DeploymentState::Building);
        assert_eq!(map_state("READY"), DeploymentState::Ready);
        assert_eq!(map_state("ERROR"), DeploymentState::Error);
        assert_eq!(map_state("CANCELED"), DeploymentState::Error);
        assert_eq!(map_state("NONE"), DeploymentState::Unknown);
    }

    #[test]
    fn test_framework_slug() {
        assert_eq!(framework_slug("NextJS"), Some("nextjs"));
        assert_eq!(framework_slug("react"), Some("create-react-app"));
        assert_eq!(framework_slug("flask"), None);
        assert_eq!(framework_slug("unknown"), None);
    }

    #[test]
    fn test_summarize_formats_timestamp() {
        let summary = summarize(&json!({
            "name": "shop",
            "url": "shop-abc.vercel.app",
            "readyState": "READY",
            "createdAt": 1_700_000_000_000i64,
        }));
        assert_eq!(summary.name, "shop");
        assert_eq!(summary.url.as_deref(), Some("https://shop-abc.vercel.app"));
        assert_eq!(summary.created_at.as_deref(), Some("2023-11-14 22:13"));
    }

    #[tokio::test]
    async fn test_trigger_deploy_requires_github_repo() {
        let handler = VercelHandler::new(HandlerConfig::new("token"));
        let err = handler.trigger_deploy("prj_1").await.unwrap_err();
        assert!(matches!(err, PlatformError::Precondition(_)));

        let mut config = HandlerConfig::new("token");
        config.repo_url = Some("https://gitlab.com/acme/shop".to_string());
        let handler = VercelHandler::new(config);
        let err = handler.trigger_deploy("prj_1").await.unwrap_err();
        assert!(err.to_string().contains("gitlab.com"));
    }
}
