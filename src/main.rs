use clap::Parser;
use colored::*;
use miniploy::{
    cli::{Cli, Commands},
    commands,
};
use std::process;

#[tokio::main]
async fn main() {
    // Tokens saved by `miniploy tokens` live in ./.env
    dotenvy::dotenv().ok();

    if let Err(e) = run().await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run() -> miniploy::Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Tokens { platform } => commands::handle_tokens(platform),
        Commands::Static {
            path,
            platform,
            name,
            yes,
        } => commands::handle_static(&path, &platform, name, yes).await,
        Commands::Manage { platform, format } => commands::handle_manage(platform, format).await,
        Commands::Deploy {
            path,
            auto,
            platform,
            json,
        } => commands::handle_deploy(&path, auto, platform, json, config).await,
        Commands::Setup {
            platform,
            project,
            name,
            yes,
        } => commands::handle_setup(platform, &project, name, yes, config).await,
        Commands::Run { dry_run } => commands::handle_run(dry_run, config).await,
    }
}
