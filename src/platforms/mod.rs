//! # Platform adapters
//!
//! One client per deployment platform. Every adapter exposes the same
//! operations (authenticate, create project, set env vars, trigger deploy,
//! status, URL, list) and maps the platform's own status vocabulary onto
//! [`DeploymentState`]. The command layer only talks to [`PlatformHandler`].

use crate::common::file_utils::SiteFile;
use crate::config::ProjectConfig;
use crate::error::{MiniployError, PlatformError, PlatformResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub mod flyio;
pub mod http;
pub mod monitor;
pub mod netlify;
pub mod railway;
pub mod render;
pub mod vercel;

pub use flyio::FlyioHandler;
pub use monitor::{monitor_deployment, PollOutcome, PollPolicy, StatusSource};
pub use netlify::NetlifyHandler;
pub use railway::RailwayHandler;
pub use render::RenderHandler;
pub use vercel::VercelHandler;

/// Supported deployment platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Vercel,
    Netlify,
    Render,
    Railway,
    Flyio,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Vercel,
        Platform::Netlify,
        Platform::Render,
        Platform::Railway,
        Platform::Flyio,
    ];

    /// Name used on the command line and in `miniploy.yaml`.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Vercel => "vercel",
            Platform::Netlify => "netlify",
            Platform::Render => "render",
            Platform::Railway => "railway",
            Platform::Flyio => "flyio",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Vercel => "Vercel",
            Platform::Netlify => "Netlify",
            Platform::Render => "Render",
            Platform::Railway => "Railway",
            Platform::Flyio => "Fly.io",
        }
    }

    pub fn token_env_var(&self) -> &'static str {
        match self {
            Platform::Vercel => "VERCEL_TOKEN",
            Platform::Netlify => "NETLIFY_TOKEN",
            Platform::Render => "RENDER_TOKEN",
            Platform::Railway => "RAILWAY_TOKEN",
            Platform::Flyio => "FLY_API_TOKEN",
        }
    }

    /// Where a user creates an API token.
    pub fn token_url(&self) -> &'static str {
        match self {
            Platform::Vercel => "https://vercel.com/account/settings/tokens",
            Platform::Netlify => "https://app.netlify.com/user/applications/personal",
            Platform::Render => "https://dashboard.render.com/u/settings?add-api-key",
            Platform::Railway => "https://railway.com/account/tokens",
            Platform::Flyio => "https://fly.io/user/personal_access_tokens",
        }
    }

    pub fn best_for(&self) -> &'static str {
        match self {
            Platform::Vercel => "Next.js, React, Static Sites",
            Platform::Netlify => "JAMstack, Static Sites",
            Platform::Render => "Full-stack, Docker, Web Services",
            Platform::Railway => "Databases, Backend Services",
            Platform::Flyio => "Containers, Global Apps",
        }
    }

    /// Platforms that accept a direct upload of static files.
    pub fn supports_static_files(&self) -> bool {
        matches!(self, Platform::Vercel | Platform::Netlify)
    }

    pub fn supported_names() -> String {
        Platform::ALL
            .iter()
            .map(Platform::name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = MiniployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vercel" => Ok(Platform::Vercel),
            "netlify" => Ok(Platform::Netlify),
            "render" => Ok(Platform::Render),
            "railway" => Ok(Platform::Railway),
            "flyio" | "fly" | "fly.io" => Ok(Platform::Flyio),
            other => Err(MiniployError::User(format!(
                "Unknown platform: {}. Supported: {}",
                other,
                Platform::supported_names()
            ))),
        }
    }
}

/// Normalized deployment lifecycle shared by all platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentState {
    Pending,
    Building,
    Ready,
    Error,
    Unknown,
}

impl DeploymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeploymentState::Ready | DeploymentState::Error)
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeploymentState::Pending => "pending",
            DeploymentState::Building => "building",
            DeploymentState::Ready => "ready",
            DeploymentState::Error => "error",
            DeploymentState::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentStatus {
    /// State as the platform reports it.
    pub native: String,
    pub state: DeploymentState,
    pub url: Option<String>,
}

impl DeploymentStatus {
    pub fn new(native: impl Into<String>, state: DeploymentState, url: Option<String>) -> Self {
        Self {
            native: native.into(),
            state,
            url,
        }
    }

    /// Nothing has been deployed yet.
    pub fn none() -> Self {
        Self::new("NONE", DeploymentState::Unknown, None)
    }
}

/// Platform, identifiers and last known state of one deployment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentHandle {
    pub platform: Platform,
    pub project_id: String,
    pub deployment_id: Option<String>,
    pub state: DeploymentState,
    pub url: Option<String>,
}

impl DeploymentHandle {
    pub fn new(platform: Platform, project_id: impl Into<String>, deployment_id: Option<String>) -> Self {
        Self {
            platform,
            project_id: project_id.into(),
            deployment_id,
            state: DeploymentState::Pending,
            url: None,
        }
    }

    /// Record a status answer; a known URL is kept when the answer has none.
    pub fn observe(&mut self, status: &DeploymentStatus) {
        self.state = status.state;
        if status.url.is_some() {
            self.url = status.url.clone();
        }
    }
}

/// One row of `list_deployments`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentSummary {
    pub name: String,
    pub url: Option<String>,
    pub status: String,
    pub created_at: Option<String>,
}

/// Outcome of uploading a static site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticDeployment {
    pub id: String,
    pub site_id: Option<String>,
    pub url: Option<String>,
    pub status: String,
    pub dashboard_url: Option<String>,
}

/// Everything an adapter needs to know about the project.
#[derive(Debug, Clone, Default)]
pub struct HandlerConfig {
    pub token: String,
    pub name: String,
    pub framework: Option<String>,
    pub runtime: Option<String>,
    pub build_command: Option<String>,
    pub start_command: Option<String>,
    pub publish_dir: Option<String>,
    pub dockerfile: Option<String>,
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    /// Vercel team scope.
    pub team_id: Option<String>,
}

impl HandlerConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    /// Adapter settings derived from the saved project configuration.
    pub fn from_project(token: impl Into<String>, project: &ProjectConfig, default_name: &str) -> Self {
        Self {
            token: token.into(),
            name: project
                .project_name
                .clone()
                .unwrap_or_else(|| default_name.to_string()),
            framework: project.framework.clone(),
            runtime: project.runtime.clone(),
            build_command: project.build_command.clone(),
            start_command: project.start_command.clone(),
            publish_dir: project.publish_dir.clone(),
            dockerfile: project.dockerfile.clone(),
            repo_url: project.repo_url.clone(),
            branch: project.branch.clone(),
            team_id: None,
        }
    }
}

/// Trimmed value, with blanks treated as absent.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// A platform adapter, one variant per platform.
#[derive(Debug)]
pub enum PlatformHandler {
    Vercel(VercelHandler),
    Netlify(NetlifyHandler),
    Render(RenderHandler),
    Railway(RailwayHandler),
    Flyio(FlyioHandler),
}

macro_rules! dispatch {
    ($self:expr, $handler:ident => $body:expr) => {
        match $self {
            PlatformHandler::Vercel($handler) => $body,
            PlatformHandler::Netlify($handler) => $body,
            PlatformHandler::Render($handler) => $body,
            PlatformHandler::Railway($handler) => $body,
            PlatformHandler::Flyio($handler) => $body,
        }
    };
}

impl PlatformHandler {
    pub fn new(platform: Platform, config: HandlerConfig) -> Self {
        match platform {
            Platform::Vercel => PlatformHandler::Vercel(VercelHandler::new(config)),
            Platform::Netlify => PlatformHandler::Netlify(NetlifyHandler::new(config)),
            Platform::Render => PlatformHandler::Render(RenderHandler::new(config)),
            Platform::Railway => PlatformHandler::Railway(RailwayHandler::new(config)),
            Platform::Flyio => PlatformHandler::Flyio(FlyioHandler::new(config)),
        }
    }

    /// Point the adapter at another API root (used against mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        dispatch!(&mut self, h => h.api_mut().set_base_url(base_url));
        self
    }

    pub fn platform(&self) -> Platform {
        match self {
            PlatformHandler::Vercel(_) => Platform::Vercel,
            PlatformHandler::Netlify(_) => Platform::Netlify,
            PlatformHandler::Render(_) => Platform::Render,
            PlatformHandler::Railway(_) => Platform::Railway,
            PlatformHandler::Flyio(_) => Platform::Flyio,
        }
    }

    pub fn config(&self) -> &HandlerConfig {
        dispatch!(self, h => h.config())
    }

    pub fn config_mut(&mut self) -> &mut HandlerConfig {
        dispatch!(self, h => h.config_mut())
    }

    /// Account the last successful `authenticate` resolved to.
    pub fn identity(&self) -> Option<&str> {
        match self {
            PlatformHandler::Vercel(h) => h.username(),
            PlatformHandler::Netlify(h) => h.email(),
            PlatformHandler::Render(h) => h.owner_id(),
            PlatformHandler::Railway(h) => h.workspace_id(),
            PlatformHandler::Flyio(h) => h.org_slug(),
        }
    }

    /// Verify the token and cache the identity context. Never errors.
    pub async fn authenticate(&mut self) -> bool {
        dispatch!(self, h => h.authenticate().await)
    }

    pub async fn create_project(&mut self) -> PlatformResult<String> {
        dispatch!(self, h => h.create_project().await)
    }

    pub async fn set_env_vars(
        &self,
        project_id: &str,
        envs: &BTreeMap<String, String>,
    ) -> PlatformResult<()> {
        if envs.is_empty() {
            return Ok(());
        }
        dispatch!(self, h => h.set_env_vars(project_id, envs).await)
    }

    /// Start a deployment. Returns the platform's deployment id when it
    /// hands one back.
    pub async fn trigger_deploy(&self, project_id: &str) -> PlatformResult<Option<String>> {
        dispatch!(self, h => h.trigger_deploy(project_id).await)
    }

    pub async fn get_status(&self, project_id: &str) -> PlatformResult<DeploymentStatus> {
        dispatch!(self, h => h.get_status(project_id).await)
    }

    pub async fn get_url(&self, project_id: &str) -> PlatformResult<Option<String>> {
        dispatch!(self, h => h.get_url(project_id).await)
    }

    /// Recent deployments, newest first. Failures yield an empty list.
    pub async fn list_deployments(&self, limit: usize) -> Vec<DeploymentSummary> {
        dispatch!(self, h => h.list_deployments(limit).await)
    }

    /// Upload a directory of static files as a new deployment.
    pub async fn deploy_static_files(
        &self,
        name: &str,
        files: &[SiteFile],
    ) -> PlatformResult<StaticDeployment> {
        match self {
            PlatformHandler::Vercel(h) => h.deploy_static_files(name, files).await,
            PlatformHandler::Netlify(h) => h.deploy_static_files(name, files).await,
            other => Err(PlatformError::Unsupported {
                platform: other.platform().display_name(),
                operation: "static file deployment",
            }),
        }
    }

    /// Manual step the user has to take when the API cannot start a deploy.
    pub fn deploy_hint(&self) -> Option<&'static str> {
        match self {
            PlatformHandler::Flyio(_) => Some(flyio::DEPLOY_HINT),
            _ => None,
        }
    }
}

impl StatusSource for PlatformHandler {
    async fn status(&self, project_id: &str) -> PlatformResult<DeploymentStatus> {
        self.get_status(project_id).await
    }
}

/// Build the handler for a platform name; `None` when the name is unknown.
pub fn get_platform_handler(name: &str, config: HandlerConfig) -> Option<PlatformHandler> {
    name.parse::<Platform>()
        .ok()
        .map(|platform| PlatformHandler::new(platform, config))
}
