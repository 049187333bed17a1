use super::http::{self, ApiClient, UPLOAD_TIMEOUT};
use super::monitor::PollPolicy;
use super::{DeploymentState, DeploymentStatus, DeploymentSummary, HandlerConfig, StaticDeployment};
use crate::common::file_utils::SiteFile;
use crate::error::{PlatformError, PlatformResult};
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::time::Duration;
use zip::write::SimpleFileOptions;

pub const BASE_URL: &str = "https://api.netlify.com/api/v1";

const SITE_SUFFIX_LEN: usize = 6;
const SITE_SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Netlify REST API client.
#[derive(Debug)]
pub struct NetlifyHandler {
    api: ApiClient,
    config: HandlerConfig,
    upload_poll: PollPolicy,
    email: Option<String>,
}

impl NetlifyHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            api: ApiClient::new(BASE_URL, config.token.clone()),
            config,
            upload_poll: PollPolicy::new(Duration::from_secs(2), 15),
            email: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.set_base_url(base_url);
        self
    }

    /// How long to wait for an uploaded deploy to go live.
    pub fn with_upload_poll(mut self, policy: PollPolicy) -> Self {
        self.upload_poll = policy;
        self
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

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub async fn authenticate(&mut self) -> bool {
        match self.api.get_json("/user", &[]).await {
            Ok(body) => {
                self.email = http::str_field(&body, "/email");
                true
            }
            Err(e) => {
                log::debug!("Netlify authentication failed: {}", e);
                false
            }
        }
    }

    pub async fn create_project(&mut self) -> PlatformResult<String> {
        let site = self
            .create_site(&self.config.name)
            .await
            .map_err(|e| e.context("create Netlify site"))?;
        http::str_field(&site, "/id").ok_or_else(|| {
            PlatformError::InvalidResponse("missing site ID".to_string())
                .context("create Netlify site")
        })
    }

    async fn create_site(&self, name: &str) -> PlatformResult<Value> {
        self.api.post_json("/sites", &[], &json!({ "name": name })).await
    }

    /// Variables live on the account; the site id scopes them.
    pub async fn set_env_vars(
        &self,
        project_id: &str,
        envs: &BTreeMap<String, String>,
    ) -> PlatformResult<()> {
        let site = self
            .api
            .get_json(&format!("/sites/{}", project_id), &[])
            .await
            .map_err(|e| e.context("look up Netlify site"))?;
        let account = http::str_field(&site, "/account_slug").ok_or_else(|| {
            PlatformError::InvalidResponse("site has no account_slug".to_string())
                .context("set Netlify variables")
        })?;

        let payload: Vec<Value> = envs
            .iter()
            .map(|(key, value)| {
                json!({
                    "key": key,
                    "values": [{ "value": value, "context": "all" }],
                })
            })
            .collect();

        self.api
            .post_json(
                &format!("/accounts/{}/env", account),
                &[("site_id", project_id.to_string())],
                &Value::Array(payload),
            )
            .await
            .map_err(|e| e.context("set Netlify variables"))?;
        Ok(())
    }

    pub async fn trigger_deploy(&self, project_id: &str) -> PlatformResult<Option<String>> {
        let body = self
            .api
            .post_json(&format!("/sites/{}/builds", project_id), &[], &json!({}))
            .await
            .map_err(|e| e.context("trigger Netlify build"))?;
        Ok(http::str_field(&body, "/deploy_id").or_else(|| http::str_field(&body, "/id")))
    }

    /// State of the most recent deploy, not the published one.
    pub async fn get_status(&self, project_id: &str) -> PlatformResult<DeploymentStatus> {
        let body = self
            .api
            .get_json(
                &format!("/sites/{}/deploys", project_id),
                &[("per_page", "1".to_string())],
            )
            .await?;
        let Some(latest) = body.as_array().and_then(|d| d.first()) else {
            return Ok(DeploymentStatus::none());
        };

        let native = http::str_field(latest, "/state").unwrap_or_else(|| "unknown".to_string());
        Ok(DeploymentStatus::new(
            native.clone(),
            map_state(&native),
            site_url(latest),
        ))
    }

    pub async fn get_url(&self, project_id: &str) -> PlatformResult<Option<String>> {
        let site = self
            .api
            .get_json(&format!("/sites/{}", project_id), &[])
            .await?;
        Ok(site_url(&site))
    }

    pub async fn list_deployments(&self, limit: usize) -> Vec<DeploymentSummary> {
        let body = match self
            .api
            .get_json("/sites", &[("per_page", limit.to_string())])
            .await
        {
            Ok(body) => body,
            Err(e) => {
                log::debug!("Listing Netlify sites failed: {}", e);
                return Vec::new();
            }
        };

        body.as_array()
            .map(|sites| sites.iter().map(summarize).collect())
            .unwrap_or_default()
    }

    /// Create a uniquely named site, upload the files as one zip and wait
    /// for the deploy to go live.
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

        let archive = build_zip(files)?;
        let site_name = format!("{}-{}", name, random_suffix());
        log::debug!(
            "Uploading {} files ({} bytes zipped) to Netlify site {}",
            files.len(),
            archive.len(),
            site_name
        );

        let site = self
            .create_site(&site_name)
            .await
            .map_err(|e| e.context("deploy to Netlify"))?;
        let site_id = http::str_field(&site, "/id").ok_or_else(|| {
            PlatformError::InvalidResponse("missing site ID".to_string())
                .context("deploy to Netlify")
        })?;

        let request = self
            .api
            .request(
                Method::POST,
                &format!("/sites/{}/deploys", site_id),
                UPLOAD_TIMEOUT,
            )
            .header(CONTENT_TYPE, "application/zip")
            .body(archive);
        let deploy = self
            .api
            .send(request)
            .await
            .map_err(|e| e.context("deploy to Netlify"))?;
        let deploy_id = http::str_field(&deploy, "/id").ok_or_else(|| {
            PlatformError::InvalidResponse("missing deploy ID".to_string())
                .context("deploy to Netlify")
        })?;

        if let Some(live) = self.wait_until_live(&site_id, &deploy_id).await? {
            return Ok(StaticDeployment {
                id: deploy_id,
                site_id: Some(site_id),
                url: site_url(&live),
                status: "ready".to_string(),
                dashboard_url: http::str_field(&live, "/admin_url"),
            });
        }

        log::info!("Netlify deploy {} still processing", deploy_id);
        Ok(StaticDeployment {
            id: deploy_id,
            site_id: Some(site_id),
            url: site_url(&site),
            status: http::str_field(&deploy, "/state").unwrap_or_else(|| "processing".to_string()),
            dashboard_url: http::str_field(&site, "/admin_url"),
        })
    }

    /// Poll an uploaded deploy. Returns the refreshed site once it is ready,
    /// `None` if it is still processing when the policy runs out.
    async fn wait_until_live(&self, site_id: &str, deploy_id: &str) -> PlatformResult<Option<Value>> {
        let path = format!("/sites/{}/deploys/{}", site_id, deploy_id);

        for attempt in 1..=self.upload_poll.max_attempts {
            match self.api.get_json(&path, &[]).await {
                Ok(deploy) => match http::str_field(&deploy, "/state").as_deref() {
                    Some("ready") => {
                        let site = self
                            .api
                            .get_json(&format!("/sites/{}", site_id), &[])
                            .await
                            .unwrap_or(deploy);
                        return Ok(Some(site));
                    }
                    Some("error") => {
                        let reason = http::str_field(&deploy, "/error_message")
                            .unwrap_or_else(|| "Unknown error".to_string());
                        return Err(PlatformError::DeployFailed(reason));
                    }
                    state => log::debug!("Netlify deploy {} is {:?}", deploy_id, state),
                },
                Err(e) => log::debug!("Netlify deploy check failed: {}", e),
            }

            if attempt < self.upload_poll.max_attempts {
                tokio::time::sleep(self.upload_poll.interval).await;
            }
        }
        Ok(None)
    }
}

fn build_zip(files: &[SiteFile]) -> PlatformResult<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for file in files {
        let content = std::fs::read(&file.absolute)?;
        writer.start_file(file.relative.as_str(), options)?;
        writer.write_all(&content)?;
    }

    Ok(writer.finish()?.into_inner())
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SITE_SUFFIX_LEN)
        .map(|_| SITE_SUFFIX_CHARS[rng.gen_range(0..SITE_SUFFIX_CHARS.len())] as char)
        .collect()
}

fn site_url(value: &Value) -> Option<String> {
    http::str_field(value, "/ssl_url").or_else(|| http::str_field(value, "/url"))
}

fn summarize(site: &Value) -> DeploymentSummary {
    let published = !site["published_deploy"].is_null();
    DeploymentSummary {
        name: http::str_field(site, "/name").unwrap_or_else(|| "N/A".to_string()),
        url: site_url(site),
        status: if published { "active" } else { "inactive" }.to_string(),
        created_at: http::str_field(site, "/created_at").map(http::short_timestamp),
    }
}

pub fn map_state(native: &str) -> DeploymentState {
    match native.to_ascii_lowercase().as_str() {
        "new" | "enqueued" | "uploading" | "uploaded" | "preparing" | "prepared"
        | "pending_review" => DeploymentState::Pending,
        "building" | "processing" | "processed" => DeploymentState::Building,
        "ready" => DeploymentState::Ready,
        "error" | "rejected" => DeploymentState::Error,
        _ => DeploymentState::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_state_mapping() {
        for pending in ["new", "enqueued", "uploading", "uploaded", "prepared"] {
            assert_eq!(map_state(pending), DeploymentState::Pending);
        }
        assert_eq!(map_state("building"), DeploymentState::Building);
        assert_eq!(map_state("processing"), DeploymentState::Building);
        assert_eq!(map_state("ready"), DeploymentState::Ready);
        assert_eq!(map_state("error"), DeploymentState::Error);
        assert_eq!(map_state("rejected"), DeploymentState::Error);
        assert_eq!(map_state("retrying"), DeploymentState::Unknown);
    }

    #[test]
    fn test_random_suffix_shape() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), SITE_SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_build_zip_keeps_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("css")).unwrap();
        fs::write(temp_dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
        fs::write(temp_dir.path().join("css/site.css"), "h1{}").unwrap();

        let files = vec![
            SiteFile {
                absolute: temp_dir.path().join("css/site.css"),
                relative: "css/site.css".to_string(),
            },
            SiteFile {
                absolute: temp_dir.path().join("index.html"),
                relative: "index.html".to_string(),
            },
        ];
        let bytes = build_zip(&files).unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<_> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["css/site.css", "index.html"]);
    }

    #[test]
    fn test_summarize_site() {
        let summary = summarize(&json!({
            "name": "blog",
            "url": "http://blog.netlify.app",
            "ssl_url": "https://blog.netlify.app",
            "published_deploy": {"state": "ready"},
            "created_at": "2024-03-01T12:30:00.000Z",
        }));
        assert_eq!(summary.url.as_deref(), Some("https://blog.netlify.app"));
        assert_eq!(summary.status, "active");
        assert_eq!(summary.created_at.as_deref(), Some("2024-03-01 12:30"));

        let summary = summarize(&json!({"name": "draft", "published_deploy": null}));
        assert_eq!(summary.status, "inactive");
        assert_eq!(summary.url, None);
    }
}
