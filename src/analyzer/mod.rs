//! # Analyzer Module
//!
//! Classifies a project for deployment: scans for well-known marker files,
//! asks the hosted model for framework, runtime and command suggestions, and
//! returns an [`AnalysisResult`].
//!
//! The analyzer never fails. Missing credentials, transport errors and
//! unparsable model output all come back as a zero-confidence result whose
//! summary explains what went wrong.

use crate::error::AnalysisError;
use crate::platforms::Platform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

pub mod llm;
pub mod scanner;

pub use scanner::{scan_marker_files, MarkerFiles};

pub const API_KEY_ENV: &str = "GROQ_API_KEY";
pub const MODEL_ENV: &str = "GROQ_MODEL";
pub const BASE_URL_ENV: &str = "GROQ_BASE_URL";
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Deployment suggestion for a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub framework: String,
    pub runtime: String,
    pub build_command: String,
    pub start_command: String,
    pub install_command: String,
    pub publish_dir: String,
    pub env_vars_needed: Vec<String>,
    pub summary: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
    pub platform_recommendations: BTreeMap<String, PlatformScore>,
}

/// How well a platform fits the project, with the model's reasoning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformScore {
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub reason: String,
}

impl AnalysisResult {
    /// Zero-confidence result carrying an explanation.
    pub fn failed(summary: impl Into<String>) -> Self {
        Self {
            framework: "unknown".to_string(),
            runtime: "unknown".to_string(),
            build_command: String::new(),
            start_command: String::new(),
            install_command: String::new(),
            publish_dir: ".".to_string(),
            env_vars_needed: Vec::new(),
            summary: summary.into(),
            confidence: 0.0,
            dockerfile: None,
            platform_recommendations: BTreeMap::new(),
        }
    }

    /// Static site served as-is from the project root.
    pub fn static_site(summary: impl Into<String>, confidence: f32) -> Self {
        let mut recommendations = BTreeMap::new();
        recommendations.insert(
            "netlify".to_string(),
            PlatformScore {
                score: 0.8,
                reason: "Good for static sites".to_string(),
            },
        );
        recommendations.insert(
            "vercel".to_string(),
            PlatformScore {
                score: 0.7,
                reason: "Supports static sites".to_string(),
            },
        );

        Self {
            framework: "static".to_string(),
            runtime: "static".to_string(),
            confidence,
            platform_recommendations: recommendations,
            ..Self::failed(summary)
        }
    }

    /// Recommendations ordered from best to worst score.
    pub fn ranked_recommendations(&self) -> Vec<(&str, &PlatformScore)> {
        let mut ranked: Vec<_> = self
            .platform_recommendations
            .iter()
            .map(|(name, score)| (name.as_str(), score))
            .collect();
        ranked.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));
        ranked
    }

    /// Highest-scored recommendation that names a supported platform.
    pub fn top_platform(&self) -> Option<Platform> {
        self.ranked_recommendations()
            .into_iter()
            .find_map(|(name, _)| name.parse().ok())
    }

    /// Mark the project as a container deployment.
    fn apply_dockerfile(&mut self) {
        self.runtime = "docker".to_string();
        self.dockerfile = Some("Dockerfile".to_string());
        if !self.summary.contains("Dockerfile") {
            self.summary = format!("{} Dockerfile detected.", self.summary)
                .trim()
                .to_string();
        }
    }
}

/// Where and how to reach the model.
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl AnalyzerSettings {
    /// Settings from `GROQ_API_KEY`, `GROQ_MODEL` and `GROQ_BASE_URL`.
    pub fn from_env() -> Self {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            api_key: var(API_KEY_ENV),
            model: var(MODEL_ENV).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: var(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            ..Self::default()
        }
    }
}

/// Analyze a project with settings taken from the environment.
pub async fn analyze_project(path: &Path) -> AnalysisResult {
    analyze_project_with(path, &AnalyzerSettings::from_env()).await
}

/// Analyze a project. Never fails; see the module docs.
pub async fn analyze_project_with(path: &Path, settings: &AnalyzerSettings) -> AnalysisResult {
    if !path.is_dir() {
        return AnalysisResult::failed(format!(
            "Analysis error: {} is not a directory",
            path.display()
        ));
    }

    let found = match scan_marker_files(path) {
        Ok(found) => found,
        Err(e) => return AnalysisResult::failed(format!("Analysis error: {}", e)),
    };

    if scanner::is_plain_html(&found) {
        log::info!("Only index.html found, treating project as a static site");
        return AnalysisResult::static_site(
            "Plain HTML site (index.html) - deploy the files as-is",
            0.8,
        );
    }

    let Some(api_key) = settings.api_key.as_deref() else {
        log::warn!("{} is not set, skipping AI analysis", API_KEY_ENV);
        return AnalysisResult::failed(format!("ERROR: {}", AnalysisError::MissingCredential));
    };

    if found.is_empty() {
        log::info!("No marker files found, treating project as a static site");
        return AnalysisResult::static_site(
            "No configuration files found - assuming static site",
            0.3,
        );
    }

    match llm::request_suggestions(&found, settings, api_key).await {
        Ok(mut result) => {
            if scanner::has_dockerfile(&found) {
                result.apply_dockerfile();
            }
            result
        }
        Err(AnalysisError::MalformedResponse(reason)) => {
            log::warn!("Model returned an unusable answer: {}", reason);
            AnalysisResult::failed(format!("AI response parsing error: {}", reason))
        }
        Err(e) => {
            log::warn!("AI analysis failed: {}", e);
            AnalysisResult::failed(format!("Analysis error: {}", e))
        }
    }
}
