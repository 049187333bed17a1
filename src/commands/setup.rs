use super::{authenticate, default_project_name, parse_platform, resolve_token};
use crate::common::{file_utils::validate_project_path, git};
use crate::config::{self, ProjectConfig};
use crate::display::{self, Panel, Tone};
use crate::error::Result;
use crate::platforms::{non_empty, HandlerConfig, Platform, PlatformHandler};
use colored::*;
use dialoguer::{Confirm, Input, Password};
use prettytable::row;
use std::collections::BTreeMap;
use std::path::Path;

const DEFAULT_DOCKERFILE: &str = "Dockerfile";
const DEFAULT_BRANCH: &str = "main";

/// Create the project on a platform and record its id in `miniploy.yaml`.
pub async fn handle_setup(
    platform: Option<String>,
    project: &Path,
    name: Option<String>,
    yes: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let Some(platform) = platform else {
        list_platforms();
        return Ok(());
    };
    let platform = parse_platform(&platform)?;
    let project_root = validate_project_path(project)?;

    println!(
        "\n{}\n",
        format!("Setting up {}...", platform.display_name())
            .bright_cyan()
            .bold()
    );

    let mut saved = match config::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Ignoring unreadable configuration: {}", e);
            ProjectConfig::default()
        }
    };

    let token = resolve_token(platform, !yes)?;
    let mut handler_config = HandlerConfig::from_project(token, &saved, &default_project_name(&project_root));

    infer_runtime(&mut handler_config, &project_root);
    if handler_config.runtime.as_deref() == Some("docker")
        && matches!(platform, Platform::Vercel | Platform::Netlify)
    {
        println!(
            "{}\n",
            format!(
                "Docker deployments are not supported on {}; the project will build from source",
                platform.display_name()
            )
            .yellow()
            .bold()
        );
    }

    fill_git_details(&mut handler_config, &project_root);
    if platform == Platform::Render && non_empty(&handler_config.repo_url).is_none() {
        if yes {
            return Err("Render needs a Git repository URL. Add a remote or set repo_url in miniploy.yaml".into());
        }
        let repo_url = Input::<String>::new()
            .with_prompt("Git repository URL for Render (required to deploy)")
            .interact_text()?;
        handler_config.repo_url = Some(repo_url.trim().to_string());
    }

    let mut handler = PlatformHandler::new(platform, handler_config);
    authenticate(&mut handler).await?;

    let project_name = match name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        Some(name) => name,
        None if yes => handler.config().name.clone(),
        None => Input::<String>::new()
            .with_prompt("Project name")
            .default(handler.config().name.clone())
            .interact_text()?,
    };
    handler.config_mut().name = project_name.clone();

    let pb = display::spinner(format!("Creating project '{}'...", project_name));
    let project_id = match handler.create_project().await {
        Ok(id) => {
            pb.finish_with_message(format!("{} {}", "Project created:".green(), id));
            id
        }
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.context("create project").into());
        }
    };

    if !yes && !saved.env_vars.is_empty() {
        collect_env_values(&mut saved.env_vars)?;
    }
    let filled = saved.filled_env_vars();
    if !filled.is_empty() {
        let pb = display::spinner(format!("Setting {} environment variables...", filled.len()));
        match handler.set_env_vars(&project_id, &filled).await {
            Ok(()) => pb.finish_with_message("Environment variables set".green().to_string()),
            Err(e) => {
                pb.finish_and_clear();
                return Err(e.into());
            }
        }
    }

    record_project(&mut saved, platform, &project_id, &project_root, handler.config());
    let saved_to = config::save_config(&saved, config_path)?;
    println!("{} {}", "Configuration saved to".green(), saved_to.display());

    let mut panel = Panel::new("Setup Complete").tone(Tone::Success);
    panel
        .field("Platform:", platform.name())
        .field("Project ID:", &project_id)
        .field("Project Name:", &project_name);
    if let Some(repo) = saved.repo_url.as_deref() {
        panel.field("Repository:", repo);
    }
    panel
        .blank()
        .text("Next step:".dimmed().to_string())
        .text(format!("  {} - deploy your application", "miniploy run".cyan()));
    panel.print();
    println!();

    Ok(())
}

fn list_platforms() {
    println!("\n{}\n", "Available Platforms".bright_cyan().bold());
    let mut table = display::table(&["Platform", "Name", "Best For"]);
    for platform in Platform::ALL {
        table.add_row(row![
            platform.name().cyan(),
            platform.display_name(),
            platform.best_for().green()
        ]);
    }
    table.printstd();
    println!("\n{}\n", "Usage: miniploy setup <platform>".dimmed());
}

/// A Dockerfile in the project switches an unset runtime to `docker`.
fn infer_runtime(config: &mut HandlerConfig, project_root: &Path) {
    if non_empty(&config.runtime).is_some() {
        return;
    }
    let dockerfile = non_empty(&config.dockerfile)
        .unwrap_or(DEFAULT_DOCKERFILE)
        .to_string();
    if project_root.join(&dockerfile).is_file() {
        log::info!("Found {}, using the docker runtime", dockerfile);
        config.runtime = Some("docker".to_string());
        config.dockerfile = Some(dockerfile);
    }
}

/// Fill repository URL and branch from `.git` when not configured.
fn fill_git_details(config: &mut HandlerConfig, project_root: &Path) {
    if non_empty(&config.repo_url).is_none() {
        config.repo_url = git::remote_url(project_root);
    }
    if non_empty(&config.branch).is_none() {
        config.branch = Some(
            git::current_branch(project_root).unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        );
    }
}

/// Prompt for the env vars that have no value yet. Blank answers stay blank.
fn collect_env_values(env_vars: &mut BTreeMap<String, String>) -> Result<()> {
    let missing: Vec<String> = env_vars
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(key, _)| key.clone())
        .collect();
    if missing.is_empty()
        || !Confirm::new()
            .with_prompt(format!("Set {} environment variables now?", missing.len()))
            .default(false)
            .interact()?
    {
        return Ok(());
    }

    for key in missing {
        let value = Password::new()
            .with_prompt(format!("  {}", key))
            .allow_empty_password(true)
            .interact()?;
        env_vars.insert(key, value.trim().to_string());
    }
    Ok(())
}

fn record_project(
    saved: &mut ProjectConfig,
    platform: Platform,
    project_id: &str,
    project_root: &Path,
    handler_config: &HandlerConfig,
) {
    saved.platform = Some(platform.name().to_string());
    saved.project_id = Some(project_id.to_string());
    saved.project_name = Some(handler_config.name.clone());
    saved.project_path = Some(project_root.display().to_string());

    let keep = |value: &Option<String>| non_empty(value).map(str::to_string);
    if let Some(runtime) = keep(&handler_config.runtime) {
        saved.runtime = Some(runtime);
    }
    if let Some(dockerfile) = keep(&handler_config.dockerfile) {
        saved.dockerfile = Some(dockerfile);
    }
    if let Some(repo_url) = keep(&handler_config.repo_url) {
        saved.repo_url = Some(repo_url);
    }
    if let Some(branch) = keep(&handler_config.branch) {
        saved.branch = Some(branch);
    }
}
