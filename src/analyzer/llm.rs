//! Chat-completion client for the hosted model (Groq, OpenAI-compatible API)
//! and the parser for its constrained JSON answer.

use super::scanner::MarkerFiles;
use super::{AnalysisResult, AnalyzerSettings, PlatformScore};
use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SYSTEM_PROMPT: &str = r#"You are an expert DevOps engineer analyzing projects for deployment.
Analyze the provided project files and return ONLY a valid JSON object with this exact structure:
{
  "framework": "nextjs|react|vue|angular|flask|fastapi|django|express|static|unknown",
  "runtime": "node|python|go|ruby|php|static|docker",
  "build_command": "npm run build",
  "start_command": "npm start",
  "install_command": "npm install",
  "publish_dir": "out|dist|build|public|.",
  "env_vars_needed": ["DATABASE_URL", "API_KEY"],
  "summary": "Brief description of detected project type",
  "confidence": 0.95,
  "platform_recommendations": {
    "vercel": {"score": 0.9, "reason": "Next.js detected, optimal for Vercel"},
    "netlify": {"score": 0.8, "reason": "Static site, good fit"},
    "render": {"score": 0.7, "reason": "Supports all frameworks"},
    "railway": {"score": 0.7, "reason": "Good for full-stack apps"},
    "flyio": {"score": 0.6, "reason": "Container-based deployment"}
  }
}

Be precise. Return ONLY valid JSON, no markdown, no explanations."#;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 2000;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

/// What the model sends back; every field may be missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelSuggestion {
    framework: Option<String>,
    runtime: Option<String>,
    build_command: Option<String>,
    start_command: Option<String>,
    install_command: Option<String>,
    publish_dir: Option<String>,
    env_vars_needed: Vec<String>,
    summary: Option<String>,
    confidence: Option<f32>,
    dockerfile: Option<String>,
    platform_recommendations: BTreeMap<String, PlatformScore>,
}

impl From<ModelSuggestion> for AnalysisResult {
    fn from(s: ModelSuggestion) -> Self {
        AnalysisResult {
            framework: s.framework.unwrap_or_else(|| "unknown".to_string()),
            runtime: s.runtime.unwrap_or_else(|| "unknown".to_string()),
            build_command: s.build_command.unwrap_or_default(),
            start_command: s.start_command.unwrap_or_default(),
            install_command: s.install_command.unwrap_or_default(),
            publish_dir: s.publish_dir.unwrap_or_else(|| ".".to_string()),
            env_vars_needed: s.env_vars_needed,
            summary: s.summary.unwrap_or_else(|| "unknown".to_string()),
            confidence: s.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
            dockerfile: s.dockerfile,
            platform_recommendations: s.platform_recommendations,
        }
    }
}

/// Send the collected marker files to the model and parse its suggestion.
pub async fn request_suggestions(
    files: &MarkerFiles,
    settings: &AnalyzerSettings,
    api_key: &str,
) -> Result<AnalysisResult, AnalysisError> {
    let context = serde_json::json!({
        "files": files,
        "file_list": files.keys().collect::<Vec<_>>(),
    });
    let user_content = serde_json::to_string_pretty(&context)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    let request = ChatRequest {
        model: &settings.model,
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: Some(SYSTEM_PROMPT.to_string()),
            },
            ChatMessage {
                role: "user".to_string(),
                content: Some(user_content),
            },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    };

    let url = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));
    log::debug!("Requesting analysis from {} ({})", url, settings.model);

    let client = reqwest::Client::builder()
        .user_agent(format!("miniploy/{}", env!("CARGO_PKG_VERSION")))
        .timeout(settings.timeout)
        .build()?;

    let response = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AnalysisError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    let chat: ChatResponse = response
        .json()
        .await
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

    let content = chat
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| AnalysisError::MalformedResponse("empty model response".to_string()))?;

    parse_model_output(&content)
}

/// Parse the model's answer, tolerating code fences and surrounding prose.
pub fn parse_model_output(content: &str) -> Result<AnalysisResult, AnalysisError> {
    let trimmed = content.trim();

    let candidates = [
        Some(trimmed.to_string()),
        extract_fenced_block(trimmed),
        extract_first_json_object(trimmed),
    ];

    let mut last_error = None;
    for candidate in candidates.into_iter().flatten() {
        match serde_json::from_str::<ModelSuggestion>(&candidate) {
            Ok(suggestion) => return Ok(suggestion.into()),
            Err(e) => last_error = Some(e),
        }
    }

    Err(AnalysisError::MalformedResponse(match last_error {
        Some(e) => e.to_string(),
        None => "no JSON object in model response".to_string(),
    }))
}

fn extract_fenced_block(content: &str) -> Option<String> {
    let start = content.find("```")?;
    let after_fence = &content[start + 3..];
    // Skip the info string (e.g. "json") on the opening fence line.
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim().to_string())
}

/// Uses the streaming deserializer to find where the first object ends.
fn extract_first_json_object(content: &str) -> Option<String> {
    for (idx, _) in content.match_indices('{') {
        let candidate = &content[idx..];
        let mut stream =
            serde_json::Deserializer::from_str(candidate).into_iter::<serde_json::Value>();
        if let Some(Ok(serde_json::Value::Object(_))) = stream.next() {
            return Some(candidate[..stream.byte_offset()].to_string());
        }
    }
    None
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
