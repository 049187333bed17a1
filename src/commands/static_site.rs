use super::{authenticate, default_project_name, parse_platform, resolve_token};
use crate::common::file_utils::{collect_site_files, validate_project_path};
use crate::display::{self, Panel, Tone};
use crate::error::Result;
use crate::platforms::{get_platform_handler, http::https_url, HandlerConfig, Platform};
use colored::*;
use dialoguer::Confirm;
use std::path::Path;

/// Deploy a directory of static files straight to Vercel or Netlify.
pub async fn handle_static(path: &Path, platform: &str, name: Option<String>, yes: bool) -> Result<()> {
    let site_root = validate_project_path(path)?;
    let platform = parse_platform(platform)?;
    if !platform.supports_static_files() {
        return Err(static_platforms_error(platform).into());
    }

    println!("\n{}", "Static Site Deployment".bright_cyan().bold());
    println!("{} {}", "Directory:".dimmed(), site_root.display());
    println!("{} {}\n", "Platform:".dimmed(), platform.display_name());

    if !site_root.join("index.html").is_file() {
        println!("{}", "Warning: no index.html found in this directory".yellow());
        if !yes
            && !Confirm::new()
                .with_prompt("Continue anyway?")
                .default(false)
                .interact()?
        {
            println!("{}", "Deployment cancelled".yellow());
            return Ok(());
        }
    }

    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default_project_name(&site_root));

    let token = resolve_token(platform, !yes)?;
    let mut config = HandlerConfig::new(token);
    config.name = name.clone();
    let Some(mut handler) = get_platform_handler(platform.name(), config) else {
        return Err(static_platforms_error(platform).into());
    };
    authenticate(&mut handler).await?;

    let files = collect_site_files(&site_root)?;
    println!("  {} {} files to upload", "Found".green(), files.len());

    let pb = display::spinner(format!("Deploying to {}...", platform.display_name()));
    let deployment = match handler.deploy_static_files(&name, &files).await {
        Ok(deployment) => {
            pb.finish_with_message("Upload complete".green().to_string());
            deployment
        }
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.into());
        }
    };

    let ready = deployment.status.eq_ignore_ascii_case("ready");
    let mut panel = Panel::new(if ready {
        "Deployment Successful"
    } else {
        "Deployment Submitted"
    });
    panel = panel.tone(if ready { Tone::Success } else { Tone::Warning });
    panel
        .field("Name:", &name)
        .field("Deployment ID:", &deployment.id)
        .field("Status:", &deployment.status);
    if let Some(site_id) = &deployment.site_id {
        panel.field("Site ID:", site_id);
    }
    if let Some(url) = &deployment.url {
        panel.field("URL:", https_url(url));
    }
    if let Some(dashboard) = &deployment.dashboard_url {
        panel.field("Dashboard:", dashboard);
    }
    if !ready {
        panel
            .blank()
            .text("The site is still processing; it goes live once the build finishes.");
    }
    panel.print();
    println!();

    Ok(())
}

fn static_platforms_error(platform: Platform) -> String {
    let supported: Vec<&str> = Platform::ALL
        .iter()
        .filter(|p| p.supports_static_files())
        .map(Platform::name)
        .collect();
    format!(
        "{} does not support static file deployment. Use one of: {}",
        platform.display_name(),
        supported.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_platforms_error_lists_capable_platforms() {
        let message = static_platforms_error(Platform::Render);
        assert_eq!(
            message,
            "Render does not support static file deployment. Use one of: vercel, netlify"
        );
    }

    #[tokio::test]
    async fn test_rejects_platform_without_static_support() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let err = handle_static(temp_dir.path(), "railway", None, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not support static file deployment"));
    }

    #[tokio::test]
    async fn test_rejects_missing_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let err = handle_static(&temp_dir.path().join("nope"), "vercel", None, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Path not found"));
    }
}
