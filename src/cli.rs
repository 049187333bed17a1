use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "miniploy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AI-assisted deployments to Vercel, Netlify, Render, Railway and Fly.io")]
#[command(long_about = "Analyzes a project with a hosted language model, suggests build and start commands, and drives the deployment platforms' APIs to create projects, set environment variables, trigger deploys and watch them go live.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the miniploy.yaml project file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage platform API tokens stored in .env
    Tokens {
        /// Platform to configure, or "all"
        #[arg(value_name = "PLATFORM")]
        platform: Option<String>,
    },

    /// Deploy a directory of static files directly
    Static {
        /// Directory containing the site
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Target platform (vercel or netlify)
        #[arg(short, long, default_value = "vercel")]
        platform: String,

        /// Site name (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,

        /// Skip confirmation prompts
        #[arg(short, long)]
        yes: bool,
    },

    /// List deployments across configured platforms
    Manage {
        /// Only query this platform
        #[arg(short, long)]
        platform: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Analyze a project and write miniploy.yaml
    Deploy {
        /// Path to the project directory to analyze
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,

        /// Save the configuration without asking
        #[arg(short, long)]
        auto: bool,

        /// Platform to configure instead of the top recommendation
        #[arg(short, long)]
        platform: Option<String>,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the project on a platform and save its id
    Setup {
        /// Platform to set up; omit to list the supported platforms
        #[arg(value_name = "PLATFORM")]
        platform: Option<String>,

        /// Path to the project directory
        #[arg(short, long = "project", value_name = "PATH", default_value = ".")]
        project: PathBuf,

        /// Project name on the platform (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,

        /// Accept defaults instead of prompting
        #[arg(short, long)]
        yes: bool,
    },

    /// Trigger a deployment of the configured project and watch it
    Run {
        /// Show what would be deployed without calling the platform
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}
