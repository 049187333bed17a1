use super::http::{self, ApiClient};
use super::{DeploymentState, DeploymentStatus, DeploymentSummary, HandlerConfig};
use crate::error::{PlatformError, PlatformResult};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const BASE_URL: &str = "https://backboard.railway.com/graphql/v2";

const ME_QUERY: &str = r#"
query {
  me {
    id
    email
    teams { edges { node { id name } } }
  }
}"#;

/// Workspace tokens cannot read `me`; their projects reveal the team.
const PROJECT_TEAMS_QUERY: &str = r#"
query {
  projects { edges { node { id name team { id name } } } }
}"#;

const PROJECT_CREATE: &str = r#"
mutation ProjectCreate($input: ProjectCreateInput!) {
  projectCreate(input: $input) { id name }
}"#;

const PROJECT_ENVIRONMENTS: &str = r#"
query ProjectEnvironments($id: String!) {
  project(id: $id) {
    environments { edges { node { id name } } }
  }
}"#;

const VARIABLES_UPSERT: &str = r#"
mutation VariableCollectionUpsert($input: VariableCollectionUpsertInput!) {
  variableCollectionUpsert(input: $input)
}"#;

const DEPLOYMENT_TRIGGER: &str = r#"
mutation DeploymentTrigger($projectId: String!) {
  deploymentTrigger(input: { projectId: $projectId }) { id }
}"#;

const LATEST_DEPLOYMENT: &str = r#"
query LatestDeployment($projectId: String!) {
  deployments(first: 1, input: { projectId: $projectId }) {
    edges { node { id status staticUrl createdAt } }
  }
}"#;

const PROJECTS_QUERY: &str = r#"
query Projects {
  projects {
    edges {
      node {
        id
        name
        createdAt
        services { edges { node { id } } }
      }
    }
  }
}"#;

/// Railway GraphQL client.
#[derive(Debug)]
pub struct RailwayHandler {
    api: ApiClient,
    config: HandlerConfig,
    workspace_id: Option<String>,
}

impl RailwayHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            api: ApiClient::new(BASE_URL, config.token.clone()),
            config,
            workspace_id: None,
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

    pub fn workspace_id(&self) -> Option<&str> {
        self.workspace_id.as_deref()
    }

    pub async fn authenticate(&mut self) -> bool {
        match self.api.graphql(ME_QUERY, None).await {
            Ok(data) if !data["me"].is_null() => {
                self.workspace_id = first_node(&data["me"]["teams"])
                    .and_then(|team| http::str_field(team, "/id"));
                return true;
            }
            Ok(_) => log::debug!("Railway `me` is empty, trying workspace token"),
            Err(e) => log::debug!("Railway `me` query failed ({}), trying workspace token", e),
        }

        match self.api.graphql(PROJECT_TEAMS_QUERY, None).await {
            Ok(data) if !data["projects"].is_null() => {
                self.workspace_id = first_node(&data["projects"])
                    .and_then(|project| http::str_field(project, "/team/id"));
                true
            }
            Ok(_) => false,
            Err(e) => {
                log::debug!("Railway authentication failed: {}", e);
                false
            }
        }
    }

    pub async fn create_project(&mut self) -> PlatformResult<String> {
        let team_id = self.workspace_id.clone().ok_or_else(|| {
            PlatformError::Precondition(
                "Workspace ID not found. Authenticate first or join a team".to_string(),
            )
        })?;

        let variables = json!({
            "input": { "name": self.config.name, "teamId": team_id }
        });
        let data = self
            .api
            .graphql(PROJECT_CREATE, Some(variables))
            .await
            .map_err(|e| e.context("create Railway project"))?;

        http::str_field(&data, "/projectCreate/id").ok_or_else(|| {
            PlatformError::InvalidResponse("missing projectCreate data".to_string())
                .context("create Railway project")
        })
    }

    /// Upserts the variables into the project's production environment,
    /// or its first environment when none is called `production`.
    pub async fn set_env_vars(
        &self,
        project_id: &str,
        envs: &BTreeMap<String, String>,
    ) -> PlatformResult<()> {
        let data = self
            .api
            .graphql(PROJECT_ENVIRONMENTS, Some(json!({ "id": project_id })))
            .await
            .map_err(|e| e.context("look up Railway environments"))?;

        let environments = nodes(&data["project"]["environments"]);
        let environment = environments
            .iter()
            .find(|env| env["name"].as_str() == Some("production"))
            .or_else(|| environments.first())
            .and_then(|env| http::str_field(env, "/id"))
            .ok_or_else(|| {
                PlatformError::InvalidResponse("project has no environments".to_string())
                    .context("set Railway variables")
            })?;

        let variables = json!({
            "input": {
                "projectId": project_id,
                "environmentId": environment,
                "variables": envs,
            }
        });
        self.api
            .graphql(VARIABLES_UPSERT, Some(variables))
            .await
            .map_err(|e| e.context("set Railway variables"))?;
        Ok(())
    }

    pub async fn trigger_deploy(&self, project_id: &str) -> PlatformResult<Option<String>> {
        let data = self
            .api
            .graphql(DEPLOYMENT_TRIGGER, Some(json!({ "projectId": project_id })))
            .await
            .map_err(|e| e.context("trigger Railway deployment"))?;
        Ok(http::str_field(&data, "/deploymentTrigger/id"))
    }

    pub async fn get_status(&self, project_id: &str) -> PlatformResult<DeploymentStatus> {
        let data = self
            .api
            .graphql(LATEST_DEPLOYMENT, Some(json!({ "projectId": project_id })))
            .await?;
        let Some(latest) = first_node(&data["deployments"]) else {
            return Ok(DeploymentStatus::none());
        };

        let native = http::str_field(latest, "/status").unwrap_or_else(|| "UNKNOWN".to_string());
        Ok(DeploymentStatus::new(
            native.clone(),
            map_state(&native),
            http::str_field(latest, "/staticUrl").map(|u| http::https_url(&u)),
        ))
    }

    /// Public domain of the latest deployment, else the project dashboard.
    pub async fn get_url(&self, project_id: &str) -> PlatformResult<Option<String>> {
        let url = match self.get_status(project_id).await {
            Ok(status) => status.url,
            Err(e) => {
                log::debug!("Railway status lookup failed: {}", e);
                None
            }
        };
        Ok(Some(url.unwrap_or_else(|| dashboard_url(project_id))))
    }

    pub async fn list_deployments(&self, limit: usize) -> Vec<DeploymentSummary> {
        let data = match self.api.graphql(PROJECTS_QUERY, None).await {
            Ok(data) => data,
            Err(e) => {
                log::debug!("Listing Railway projects failed: {}", e);
                return Vec::new();
            }
        };

        nodes(&data["projects"])
            .into_iter()
            .take(limit)
            .map(|project| {
                let has_services = !nodes(&project["services"]).is_empty();
                DeploymentSummary {
                    name: http::str_field(project, "/name").unwrap_or_else(|| "N/A".to_string()),
                    url: http::str_field(project, "/id").map(|id| dashboard_url(&id)),
                    status: if has_services { "active" } else { "inactive" }.to_string(),
                    created_at: http::str_field(project, "/createdAt").map(http::short_timestamp),
                }
            })
            .collect()
    }
}

pub fn dashboard_url(project_id: &str) -> String {
    format!("https://railway.app/project/{}", project_id)
}

/// Nodes of a Relay-style `{ edges: [{ node }] }` connection.
fn nodes(connection: &Value) -> Vec<&Value> {
    connection["edges"]
        .as_array()
        .map(|edges| edges.iter().map(|edge| &edge["node"]).collect())
        .unwrap_or_default()
}

fn first_node(connection: &Value) -> Option<&Value> {
    nodes(connection).into_iter().next()
}

pub fn map_state(native: &str) -> DeploymentState {
    match native.to_ascii_uppercase().as_str() {
        "QUEUED" | "INITIALIZING" | "WAITING" => DeploymentState::Pending,
        "BUILDING" | "DEPLOYING" => DeploymentState::Building,
        "SUCCESS" | "SLEEPING" => DeploymentState::Ready,
        "FAILED" | "CRASHED" | "REMOVED" => DeploymentState::Error,
        _ => DeploymentState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mapping() {
        assert_eq!(map_state("QUEUED"), DeploymentState::Pending);
        assert_eq!(map_state("WAITING"), DeploymentState::Pending);
        assert_eq!(map_state("BUILDING"), DeploymentState::Building);
        assert_eq!(map_state("DEPLOYING"), DeploymentState::Building);
        assert_eq!(map_state("SUCCESS"), DeploymentState::Ready);
        assert_eq!(map_state("SLEEPING"), DeploymentState::Ready);
        assert_eq!(map_state("CRASHED"), DeploymentState::Error);
        assert_eq!(map_state("REMOVED"), DeploymentState::Error);
        assert_eq!(map_state("SKIPPED"), DeploymentState::Unknown);
    }

    #[test]
    fn test_connection_nodes() {
        let connection = json!({"edges": [{"node": {"id": "a"}}, {"node": {"id": "b"}}]});
        let ids: Vec<_> = nodes(&connection)
            .into_iter()
            .filter_map(|n| n["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(nodes(&Value::Null).is_empty());
        assert!(first_node(&json!({"edges": []})).is_none());
    }

    #[tokio::test]
    async fn test_create_requires_workspace() {
        let mut handler = RailwayHandler::new(HandlerConfig::new("token"));
        let err = handler.create_project().await.unwrap_err();
        assert!(err.to_string().contains("Workspace ID"));
    }
}
