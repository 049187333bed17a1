use super::parse_platform;
use crate::analyzer::{analyze_project, AnalysisResult};
use crate::common::file_utils::validate_project_path;
use crate::config::{self, AnalysisStamp, ProjectConfig, CONFIG_FILENAME};
use crate::display::{self, capitalize, confidence_bar, Panel, Tone};
use crate::error::Result;
use crate::platforms::Platform;
use colored::*;
use dialoguer::Confirm;
use prettytable::row;
use std::path::Path;

/// Analyze a project and save the suggested configuration.
pub async fn handle_deploy(
    path: &Path,
    auto: bool,
    platform: Option<String>,
    json: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let project_root = validate_project_path(path)?;
    let platform = platform.as_deref().map(parse_platform).transpose()?;

    if !json {
        println!(
            "\n{} {}\n",
            "Analyzing project at:".bright_cyan().bold(),
            project_root.display()
        );
    }

    let pb = (!json).then(|| display::spinner("AI analyzing codebase..."));
    let result = analyze_project(&project_root).await;
    if let Some(pb) = pb {
        pb.finish_with_message("Analysis complete".green().to_string());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        // JSON output is for scripts; only --auto saves without a prompt.
        if !auto {
            return Ok(());
        }
    } else {
        print_analysis(&result, platform.is_none());
        println!();
    }

    let should_save = if auto {
        if !json {
            println!("{}", "Auto mode enabled, saving configuration".green().bold());
        }
        true
    } else {
        Confirm::new()
            .with_prompt(format!("Save this configuration to {}?", CONFIG_FILENAME))
            .default(true)
            .interact()?
    };

    if !should_save {
        println!("\n{}", "Configuration not saved. Run again when ready.".yellow());
        return Ok(());
    }

    let existing = config::load_config(config_path)?;
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let chosen = platform.or_else(|| result.top_platform());
    let updated = apply_analysis(existing, &result, chosen, &project_root, timestamp);
    let saved_to = config::save_config(&updated, config_path)?;

    if !json {
        println!(
            "\n{} {}",
            "Configuration saved to".green().bold(),
            saved_to.display()
        );
        println!("\n{}", "Next steps:".dimmed());
        let setup = match chosen {
            Some(p) => format!("miniploy setup {}", p.name()),
            None => "miniploy setup <platform>".to_string(),
        };
        println!("  1. {} - create the project on the platform", setup.cyan());
        println!("  2. {} - deploy your application", "miniploy run".cyan());
    }

    Ok(())
}

fn print_analysis(result: &AnalysisResult, show_recommendations: bool) {
    if result.confidence < 0.3 {
        println!(
            "{}\n",
            "AI confidence is very low. Results may not be accurate."
                .red()
                .bold()
        );
    } else if result.confidence < 0.6 {
        println!(
            "{}\n",
            "AI confidence is moderate. Please review suggestions carefully."
                .yellow()
                .bold()
        );
    }

    let mut panel = Panel::new("AI Analysis Results").tone(Tone::Success);
    panel
        .field("Framework:", &result.framework)
        .field("Runtime:", &result.runtime)
        .field("Confidence:", confidence_bar(result.confidence))
        .blank()
        .text(&result.summary);
    panel.print();

    println!("\n{}\n", "Suggested Configuration".bright_cyan().bold());
    let or = |value: &str, fallback: &str| {
        if value.trim().is_empty() {
            fallback.dimmed().to_string()
        } else {
            value.green().to_string()
        }
    };
    let mut table = display::table(&["Setting", "Value"]);
    table.add_row(row!["Runtime", or(&result.runtime, "unknown")]);
    table.add_row(row!["Build Command", or(&result.build_command, "(none)")]);
    table.add_row(row!["Start Command", or(&result.start_command, "(none)")]);
    table.add_row(row!["Install Command", or(&result.install_command, "(auto-detected)")]);
    table.add_row(row!["Publish Directory", or(&result.publish_dir, ".")]);
    if let Some(dockerfile) = &result.dockerfile {
        table.add_row(row!["Dockerfile", dockerfile.green()]);
    }
    table.printstd();

    if !result.env_vars_needed.is_empty() {
        println!("\n{}", "Environment Variables Needed".yellow().bold());
        for var in &result.env_vars_needed {
            println!("  • {}", var);
        }
    }

    let ranked = result.ranked_recommendations();
    if show_recommendations && !ranked.is_empty() {
        println!("\n{}\n", "Platform Recommendations".bright_cyan().bold());
        let mut table = display::table(&["Platform", "Score", "Reason"]);
        for (name, score) in ranked {
            table.add_row(row![
                capitalize(name),
                format!("{:.0}%", score.score * 100.0),
                score.reason
            ]);
        }
        table.printstd();
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Merge an analysis into the saved configuration.
///
/// Fields the analysis produces are replaced. Env var values already filled
/// in are kept. Switching platform drops the previous platform's project.
fn apply_analysis(
    mut config: ProjectConfig,
    result: &AnalysisResult,
    platform: Option<Platform>,
    project_root: &Path,
    timestamp: String,
) -> ProjectConfig {
    config.framework = Some(result.framework.clone());
    config.runtime = Some(result.runtime.clone());
    config.build_command = non_blank(&result.build_command);
    config.start_command = non_blank(&result.start_command);
    config.install_command = non_blank(&result.install_command);
    config.publish_dir = non_blank(&result.publish_dir).or_else(|| Some(".".to_string()));
    config.dockerfile = result.dockerfile.clone().or(config.dockerfile);
    config.project_path = Some(project_root.display().to_string());

    for var in &result.env_vars_needed {
        config.env_vars.entry(var.clone()).or_default();
    }

    if let Some(platform) = platform {
        if config.platform.as_deref() != Some(platform.name()) {
            config.project_id = None;
        }
        config.platform = Some(platform.name().to_string());
    }

    config.ai_analysis = Some(AnalysisStamp {
        confidence: result.confidence,
        timestamp,
    });
    config
}
