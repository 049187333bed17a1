//! Subcommand implementations. Each `handle_*` function owns one CLI verb;
//! the helpers here cover what several of them share: platform lookup,
//! token resolution and authentication.

use crate::config::secrets;
use crate::display;
use crate::error::{PlatformError, Result};
use crate::platforms::{Platform, PlatformHandler};
use colored::*;
use dialoguer::{Confirm, Password};
use std::path::Path;

pub mod deploy;
pub mod manage;
pub mod run;
pub mod setup;
pub mod static_site;
pub mod tokens;

pub use deploy::handle_deploy;
pub use manage::handle_manage;
pub use run::handle_run;
pub use setup::handle_setup;
pub use static_site::handle_static;
pub use tokens::handle_tokens;

/// Parse a platform name, turning unknown names into a user error.
pub fn parse_platform(name: &str) -> Result<Platform> {
    name.parse()
}

/// Platform token from the environment, or a masked prompt when allowed.
/// A prompted token can be saved to `./.env` for next time.
pub fn resolve_token(platform: Platform, interactive: bool) -> Result<String> {
    let env_var = platform.token_env_var();
    if let Some(token) = secrets::token_from_env(env_var) {
        log::debug!("Using {} from environment", env_var);
        return Ok(token);
    }

    if !interactive {
        return Err(PlatformError::MissingCredential { env_var }.into());
    }

    println!(
        "{} {}",
        "API token not found in environment variable".yellow(),
        env_var.yellow().bold()
    );
    println!("{} {}\n", "Get your token from:".cyan(), platform.token_url());

    let token = Password::new()
        .with_prompt(format!("Enter your {} API token", platform.display_name()))
        .allow_empty_password(true)
        .interact()?;
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(PlatformError::MissingCredential { env_var }.into());
    }

    if Confirm::new()
        .with_prompt(format!("Save {} to .env?", env_var))
        .default(true)
        .interact()?
    {
        let env_file = secrets::ensure_env_file(&std::env::current_dir()?)?;
        secrets::set_env_key(&env_file, env_var, &token)?;
        println!("{} {}", "Saved to".green(), env_file.display());
    }

    Ok(token)
}

/// Authenticate with a spinner, failing with a user-facing error.
pub async fn authenticate(handler: &mut PlatformHandler) -> Result<()> {
    let platform = handler.platform();
    let pb = display::spinner(format!("Authenticating with {}...", platform.display_name()));

    if !handler.authenticate().await {
        pb.finish_and_clear();
        return Err(format!(
            "Authentication with {} failed. Check your {} token",
            platform.display_name(),
            platform.token_env_var()
        )
        .into());
    }

    match handler.identity() {
        Some(who) => pb.finish_with_message(format!("{} {}", "Authenticated as".green(), who)),
        None => pb.finish_with_message("Authenticated".green().to_string()),
    }
    Ok(())
}

/// Platform-friendly name derived from a directory: lowercase ASCII
/// letters, digits and single dashes.
pub fn default_project_name(path: &Path) -> String {
    let raw = path
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();

    let mut name = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch.to_ascii_lowercase());
        } else if !name.ends_with('-') {
            name.push('-');
        }
    }

    let name = name.trim_matches('-').to_string();
    if name.is_empty() {
        "miniploy-app".to_string()
    } else {
        name
    }
}
