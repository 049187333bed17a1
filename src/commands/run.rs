use super::{default_project_name, parse_platform, resolve_token};
use crate::config::{self, ProjectConfig};
use crate::display::{self, Panel, Tone};
use crate::error::{PlatformError, Result};
use crate::platforms::{
    get_platform_handler, monitor_deployment, DeploymentHandle, DeploymentState, HandlerConfig,
    PollOutcome, PollPolicy,
};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Trigger a deployment of the configured project and watch it go live.
pub async fn handle_run(dry_run: bool, config_path: Option<&Path>) -> Result<()> {
    let project = config::load_config(config_path)?;
    let platform = parse_platform(project.require_platform()?)?;
    let project_id = project.require_project_id()?.to_string();

    println!(
        "\n{}",
        format!("Deploying to {}...", platform.display_name())
            .bright_cyan()
            .bold()
    );
    deployment_info(&project, platform.display_name(), &project_id).print();

    if dry_run {
        println!("\n{}\n", "DRY RUN - no deployment triggered".yellow().bold());
        return Ok(());
    }

    let token = resolve_token(platform, false)?;
    let default_name = project
        .project_path
        .as_deref()
        .map(|p| default_project_name(Path::new(p)))
        .unwrap_or_else(|| "miniploy-app".to_string());
    let config = HandlerConfig::from_project(token, &project, &default_name);
    let handler = get_platform_handler(platform.name(), config)
        .ok_or_else(|| format!("Platform handler not found: {}", platform))?;

    if let Some(hint) = handler.deploy_hint() {
        println!(
            "\n{} {} {}\n",
            platform.display_name(),
            "deployments are started from the project directory with".yellow(),
            hint.cyan().bold()
        );
        return Ok(());
    }

    let pb = display::spinner("Starting deployment...");
    let deployment_id = match handler.trigger_deploy(&project_id).await {
        Ok(id) => id,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.context("trigger deployment").into());
        }
    };
    match &deployment_id {
        Some(id) => pb.finish_with_message(format!("{} {}", "Deployment started:".green(), id)),
        None => pb.finish_with_message("Deployment triggered".green().to_string()),
    }

    let mut deployment = DeploymentHandle::new(platform, project_id.clone(), deployment_id);
    let policy = PollPolicy::default();

    println!("\n{}", "Monitoring deployment status...".bright_cyan());
    let bar = progress_bar(policy.max_attempts);
    let outcome = monitor_deployment(&handler, &project_id, policy, |attempt, status| {
        deployment.observe(status);
        bar.set_position(attempt as u64);
        bar.set_message(format!("Deploying... ({})", status.native));
    })
    .await;

    match &outcome {
        PollOutcome::Finished(status) if status.state == DeploymentState::Ready => {
            bar.finish_with_message("Deployment successful!".green().to_string())
        }
        PollOutcome::Finished(_) => bar.finish_with_message("Deployment failed!".red().to_string()),
        PollOutcome::TimedOut(_) => bar.finish_with_message("Still deploying".yellow().to_string()),
        PollOutcome::Interrupted(_) => bar.abandon_with_message("Status check failed".yellow().to_string()),
    }

    if deployment.url.is_none() || deployment.state == DeploymentState::Ready {
        match handler.get_url(&project_id).await {
            Ok(Some(url)) => deployment.url = Some(url),
            Ok(None) => {}
            Err(e) => log::debug!("Could not fetch deployment URL: {}", e),
        }
    }

    report(&deployment, outcome)
}

fn deployment_info(project: &ProjectConfig, platform: &str, project_id: &str) -> Panel {
    let or = |value: &Option<String>, fallback: &str| {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    let mut panel = Panel::new("Deployment Info");
    panel
        .field("Platform:", platform)
        .field("Project ID:", project_id)
        .field("Framework:", or(&project.framework, "unknown"))
        .field("Build Command:", or(&project.build_command, "(auto)"))
        .field("Start Command:", or(&project.start_command, "(auto)"));
    if let Some(runtime) = project.runtime.as_deref() {
        panel.field("Runtime:", runtime);
    }
    panel
}

fn progress_bar(max_attempts: u32) -> ProgressBar {
    let bar = ProgressBar::new(max_attempts as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.cyan} {msg:<32} [{bar:30.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.set_message("Deploying...");
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Print the closing panel. A deployment that ended in the error state is
/// the only outcome reported as a failure.
fn report(deployment: &DeploymentHandle, outcome: PollOutcome) -> Result<()> {
    let platform = deployment.platform.display_name();
    let url = deployment.url.as_deref();

    match outcome {
        PollOutcome::Finished(status) if status.state == DeploymentState::Ready => {
            let mut panel = Panel::new("Deployment Successful").tone(Tone::Success);
            panel
                .field("Status:", &status.native)
                .field("URL:", url.unwrap_or("Check the platform dashboard"))
                .blank()
                .text(format!("View logs in your {} dashboard", platform).dimmed().to_string());
            panel.print();
            if let Some(url) = url {
                println!("\n{} {}\n", "Visit your app:".bright_cyan().bold(), url);
            }
            Ok(())
        }
        PollOutcome::Finished(status) => {
            let mut panel = Panel::new("Deployment Failed").tone(Tone::Failure);
            panel
                .field("Status:", &status.native)
                .blank()
                .text(format!("Check the build logs in your {} dashboard", platform));
            panel.print();
            println!();
            Err(PlatformError::DeployFailed(format!("{} reported {}", platform, status.native)).into())
        }
        PollOutcome::TimedOut(last) => {
            let native = last
                .map(|s| s.native)
                .unwrap_or_else(|| deployment.state.to_string());
            in_progress(&native, url, platform);
            Ok(())
        }
        PollOutcome::Interrupted(e) => {
            println!("\n{} {}", "Status check failed:".yellow(), e);
            in_progress(&deployment.state.to_string(), url, platform);
            Ok(())
        }
    }
}

fn in_progress(native: &str, url: Option<&str>, platform: &str) {
    let mut panel = Panel::new("Deployment In Progress").tone(Tone::Warning);
    panel
        .field("Status:", native)
        .field("URL:", url.unwrap_or("Pending"));
    panel.print();
    println!(
        "\n{}\n",
        format!("Check the {} dashboard for details", platform).dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::{DeploymentStatus, Platform};
    use tempfile::TempDir;

    fn handle() -> DeploymentHandle {
        DeploymentHandle::new(Platform::Render, "srv-1", Some("dep-1".to_string()))
    }

    #[test]
    fn test_error_state_is_reported_as_failure() {
        let status = DeploymentStatus::new("build_failed", DeploymentState::Error, None);
        let err = report(&handle(), PollOutcome::Finished(status)).unwrap_err();
        assert!(err.to_string().contains("build_failed"));
    }

    #[test]
    fn test_timeout_is_not_a_failure() {
        let status = DeploymentStatus::new("build_in_progress", DeploymentState::Building, None);
        assert!(report(&handle(), PollOutcome::TimedOut(Some(status))).is_ok());
        assert!(report(&handle(), PollOutcome::TimedOut(None)).is_ok());
    }

    #[test]
    fn test_ready_is_success() {
        let status = DeploymentStatus::new("live", DeploymentState::Ready, None);
        assert!(report(&handle(), PollOutcome::Finished(status)).is_ok());
    }

    #[tokio::test]
    async fn test_missing_platform_stops_before_any_call() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("miniploy.yaml");
        std::fs::write(&path, "framework: static\n").unwrap();

        let err = handle_run(true, Some(&path)).await.unwrap_err();
        assert!(err.to_string().contains("No platform configured"));
    }

    #[tokio::test]
    async fn test_missing_project_id_stops_before_any_call() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("miniploy.yaml");
        std::fs::write(&path, "platform: netlify\n").unwrap();

        let err = handle_run(true, Some(&path)).await.unwrap_err();
        assert!(err.to_string().contains("No project ID found"));
    }

    #[tokio::test]
    async fn test_dry_run_succeeds_without_token() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("miniploy.yaml");
        std::fs::write(&path, "platform: railway\nproject_id: prj-1\n").unwrap();

        assert!(handle_run(true, Some(&path)).await.is_ok());
    }
}
