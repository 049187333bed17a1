//! # miniploy
//!
//! AI-assisted deployments from the command line. `miniploy` inspects a
//! project directory, asks a hosted language model to classify it and suggest
//! build and start commands, and then drives the Vercel, Netlify, Render,
//! Railway and Fly.io APIs to create the project, set its environment, trigger
//! a deploy and watch it go live.
//!
//! ## Example
//!
//! ```rust,no_run
//! use miniploy::{analyze_project, get_platform_handler, platforms::HandlerConfig};
//! use std::path::Path;
//!
//! # async fn demo() -> miniploy::Result<()> {
//! let analysis = analyze_project(Path::new("./my-app")).await;
//! println!("{} ({:.0}%)", analysis.framework, analysis.confidence * 100.0);
//!
//! if let Some(mut handler) = get_platform_handler("render", HandlerConfig::new("rnd_xxx")) {
//!     if handler.authenticate().await {
//!         for deployment in handler.list_deployments(5).await {
//!             println!("{} {}", deployment.name, deployment.status);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod cli;
pub mod commands;
pub mod common;
pub mod config;
pub mod display;
pub mod error;
pub mod platforms;

pub use analyzer::{analyze_project, AnalysisResult};
pub use config::ProjectConfig;
pub use error::{MiniployError, Result};
pub use platforms::{get_platform_handler, Platform, PlatformHandler};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
