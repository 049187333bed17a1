use crate::config::secrets::{self, mask_token};
use crate::display;
use crate::error::Result;
use crate::platforms::Platform;
use colored::*;
use dialoguer::{Password, Select};
use prettytable::row;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn handle_tokens(platform: Option<String>) -> Result<()> {
    let Some(platform) = platform else {
        return tokens_menu();
    };

    if platform.trim().eq_ignore_ascii_case("all") {
        return add_all_tokens();
    }

    let platform = platform.parse::<Platform>().map_err(|_| {
        format!(
            "Unknown platform: {}. Supported: {}, all",
            platform,
            Platform::supported_names()
        )
    })?;
    add_token(platform)
}

fn env_file() -> Result<PathBuf> {
    secrets::ensure_env_file(&std::env::current_dir()?)
}

/// Token per platform, from `.env` first, then the process environment.
fn current_tokens(env_file: &Path) -> Result<BTreeMap<Platform, String>> {
    let stored = secrets::read_env_file(env_file)?;
    Ok(Platform::ALL
        .into_iter()
        .filter_map(|platform| {
            let env_var = platform.token_env_var();
            stored
                .get(env_var)
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .or_else(|| secrets::token_from_env(env_var))
                .map(|token| (platform, token))
        })
        .collect())
}

fn tokens_menu() -> Result<()> {
    println!("\n{}\n", "API Token Manager".bright_cyan().bold());

    let env_file = env_file()?;
    let tokens = current_tokens(&env_file)?;

    let mut table = display::table(&["Platform", "Status", "Get Token"]);
    for platform in Platform::ALL {
        let status = if tokens.contains_key(&platform) {
            "✓ Set".green().to_string()
        } else {
            "✗ Not set".red().to_string()
        };
        table.add_row(row![platform.display_name(), status, platform.token_url()]);
    }
    table.printstd();
    println!();

    let options = [
        "Add or update the token for one platform",
        "Add tokens for all platforms",
        "View current tokens (masked)",
        "Exit",
    ];
    let choice = Select::new()
        .with_prompt("Choose an option")
        .items(&options)
        .default(0)
        .interact()?;

    match choice {
        0 => {
            let names: Vec<&str> = Platform::ALL.iter().map(Platform::display_name).collect();
            let selected = Select::new()
                .with_prompt("Select platform")
                .items(&names)
                .default(0)
                .interact()?;
            add_token(Platform::ALL[selected])
        }
        1 => add_all_tokens(),
        2 => {
            view_tokens(&tokens);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn add_token(platform: Platform) -> Result<()> {
    let env_file = env_file()?;

    println!(
        "\n{}\n",
        format!("{} Token Setup", platform.display_name()).bright_cyan().bold()
    );
    println!("{}\n  {}\n", "Get your token from:".yellow(), platform.token_url());

    let token = prompt_token(&format!("Enter your {} API token", platform.display_name()))?;
    match token {
        Some(token) => {
            secrets::set_env_key(&env_file, platform.token_env_var(), &token)?;
            println!(
                "{}\n",
                format!("✓ {} token saved to {}", platform.display_name(), env_file.display())
                    .green()
                    .bold()
            );
        }
        None => println!("{}\n", "Skipped".yellow()),
    }
    Ok(())
}

fn add_all_tokens() -> Result<()> {
    let env_file = env_file()?;

    println!("\n{}", "Add Tokens for All Platforms".bright_cyan().bold());
    println!("{}\n", "Press Enter without a token to skip a platform".dimmed());

    let mut saved = 0;
    for platform in Platform::ALL {
        println!("{}", platform.display_name().cyan());
        println!("  {}", platform.token_url());

        match prompt_token("Enter token (or press Enter to skip)")? {
            Some(token) => {
                secrets::set_env_key(&env_file, platform.token_env_var(), &token)?;
                saved += 1;
                println!("{}\n", "✓ Saved".green());
            }
            None => println!("{}\n", "Skipped".yellow()),
        }
    }

    println!(
        "{}\n",
        format!("Token setup complete ({} saved to {})", saved, env_file.display())
            .green()
            .bold()
    );
    Ok(())
}

fn view_tokens(tokens: &BTreeMap<Platform, String>) {
    println!("\n{}\n", "Current Tokens (masked)".bright_cyan().bold());

    let mut table = display::table(&["Platform", "Variable", "Token"]);
    for platform in Platform::ALL {
        let token = match tokens.get(&platform) {
            Some(token) => mask_token(token).yellow().to_string(),
            None => "Not set".dimmed().to_string(),
        };
        table.add_row(row![platform.display_name(), platform.token_env_var(), token]);
    }
    table.printstd();
    println!();
}

/// Masked prompt; an empty answer means "skip".
fn prompt_token(prompt: &str) -> Result<Option<String>> {
    let token = Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()?;
    let token = token.trim().to_string();
    Ok((!token.is_empty()).then_some(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_current_tokens_reads_env_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".env");
        fs::write(&path, "RENDER_TOKEN=rnd_abcdefghijklmnop\nVERCEL_TOKEN=\n").unwrap();

        let tokens = current_tokens(&path).unwrap();
        assert_eq!(
            tokens.get(&Platform::Render).map(String::as_str),
            Some("rnd_abcdefghijklmnop")
        );
        // Blank entries count as unset unless the environment has one.
        if std::env::var("VERCEL_TOKEN").is_err() {
            assert!(!tokens.contains_key(&Platform::Vercel));
        }
    }

    #[test]
    fn test_unknown_platform_is_rejected_before_prompting() {
        let err = handle_tokens(Some("heroku".to_string())).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Unknown platform: heroku"));
        assert!(message.ends_with(", all"));
    }
}
