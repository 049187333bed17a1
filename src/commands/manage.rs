use super::parse_platform;
use crate::cli::OutputFormat;
use crate::config::secrets::token_from_env;
use crate::display::{self, truncate};
use crate::error::Result;
use crate::platforms::{DeploymentSummary, HandlerConfig, Platform, PlatformHandler};
use colored::*;
use prettytable::row;
use serde::Serialize;

const LIST_LIMIT: usize = 10;

#[derive(Debug, Serialize)]
struct ListedDeployment {
    platform: Platform,
    #[serde(flatten)]
    summary: DeploymentSummary,
}

/// List recent deployments on every platform that has a token configured.
pub async fn handle_manage(platform: Option<String>, format: OutputFormat) -> Result<()> {
    let platforms = match platform {
        Some(name) => vec![parse_platform(&name)?],
        None => Platform::ALL.to_vec(),
    };
    let json = format == OutputFormat::Json;

    if !json {
        println!("\n{}\n", "Deployments".bright_cyan().bold());
    }

    let mut listed = Vec::new();
    for platform in platforms {
        listed.extend(
            collect_platform(platform, json)
                .await
                .into_iter()
                .map(|summary| ListedDeployment { platform, summary }),
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    if listed.is_empty() {
        println!("\n{}", "No deployments found".yellow());
        println!(
            "{} {}",
            "Tip:".dimmed(),
            "add tokens with `miniploy tokens` and create projects with `miniploy setup`".dimmed()
        );
        return Ok(());
    }

    let mut table = display::table(&["Platform", "Name", "URL", "Status", "Created"]);
    for entry in &listed {
        let summary = &entry.summary;
        table.add_row(row![
            entry.platform.display_name(),
            truncate(&summary.name, 30),
            summary
                .url
                .as_deref()
                .map(|u| truncate(u, 50))
                .unwrap_or_else(|| "-".to_string()),
            colour_status(&summary.status),
            summary.created_at.as_deref().unwrap_or("-")
        ]);
    }
    println!();
    table.printstd();
    println!("\n{} {}", "Total:".dimmed(), listed.len());

    Ok(())
}

/// One platform's deployments, reporting progress on a spinner line.
async fn collect_platform(platform: Platform, quiet: bool) -> Vec<DeploymentSummary> {
    let name = platform.display_name();
    let Some(token) = token_from_env(platform.token_env_var()) else {
        if !quiet {
            println!("  {} {} {}", "-".dimmed(), name, "no token".dimmed());
        }
        return Vec::new();
    };

    let pb = (!quiet).then(|| display::spinner(format!("Checking {}...", name)));
    let mut handler = PlatformHandler::new(platform, HandlerConfig::new(token));

    if !handler.authenticate().await {
        if let Some(pb) = pb {
            pb.finish_with_message(format!("{} {}", name, "authentication failed".red()));
        }
        return Vec::new();
    }

    let deployments = handler.list_deployments(LIST_LIMIT).await;
    if let Some(pb) = pb {
        pb.finish_with_message(format!(
            "{} {}",
            name,
            format!("{} found", deployments.len()).green()
        ));
    }
    deployments
}

fn colour_status(status: &str) -> String {
    match status.to_ascii_lowercase().as_str() {
        "ready" | "live" | "active" | "deployed" | "success" | "running" => status.green().to_string(),
        "error" | "failed" | "build_failed" | "canceled" | "crashed" => status.red().to_string(),
        _ => status.yellow().to_string(),
    }
}
