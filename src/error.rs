use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MiniployError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Platform(#[from] PlatformError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("{0}")]
    User(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config from {path}: {reason}")]
    InvalidFile { path: PathBuf, reason: String },

    #[error("Failed to save config to {path}: {reason}")]
    SaveFailed { path: PathBuf, reason: String },

    #[error("No platform configured. Run 'miniploy setup <platform>' first")]
    MissingPlatform,

    #[error("No project ID found. Run 'miniploy setup <platform>' to create a project")]
    MissingProjectId,
}

/// Failures raised by the platform adapters.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("API token not found in environment variable {env_var}")]
    MissingCredential { env_var: &'static str },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{status} - {message}")]
    Api { status: u16, message: String },

    #[error("GraphQL Error: {0}")]
    GraphQl(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Precondition(String),

    #[error("Deployment failed: {0}")]
    DeployFailed(String),

    #[error("Failed to read site files: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("{platform} does not support {operation}")]
    Unsupported {
        platform: &'static str,
        operation: &'static str,
    },

    #[error("Failed to {action}: {source}")]
    Context {
        action: String,
        #[source]
        source: Box<PlatformError>,
    },
}

impl PlatformError {
    /// Wraps the error with the operation that was being attempted.
    pub fn context(self, action: impl Into<String>) -> Self {
        PlatformError::Context {
            action: action.into(),
            source: Box::new(self),
        }
    }
}

/// Failures inside the project analyzer. These never leave the analyzer;
/// they are folded into a zero-confidence result.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("GROQ_API_KEY not set in environment")]
    MissingCredential,

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("model endpoint returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("{0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, MiniployError>;
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

impl From<&str> for MiniployError {
    fn from(message: &str) -> Self {
        MiniployError::User(message.to_string())
    }
}

impl From<String> for MiniployError {
    fn from(message: String) -> Self {
        MiniployError::User(message)
    }
}
