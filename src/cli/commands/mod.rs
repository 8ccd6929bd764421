//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod captcha;
mod gather;
mod helpers;
mod run;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "fssp")]
#[command(about = "Enforcement proceeding acquisition from the FSSP bailiff service")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true, env = "FSSP_CONFIG")]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Proxy list file, one URI per line (overrides config)
    #[arg(short, long, global = true)]
    proxies: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Query every request in a JSON file and store the proceedings found
    Run {
        /// JSON array of request specs
        requests: PathBuf,
        /// Output file for batches (JSON lines, overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the state of the current batch run
    Status,

    /// Solve a single captcha stored in a file (base64 or data URI)
    Solve {
        /// File holding the challenge
        file: PathBuf,
    },

    /// Measure solver accuracy against human-labelled samples
    Measure {
        /// JSON array of {"challenge", "reference"} objects
        samples: PathBuf,
    },

    /// Download fresh captcha images into the captcha ledger for labelling
    Gather {
        /// Number of challenges to collect
        #[arg(default_value = "10")]
        count: usize,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let (mut settings, _config) = load_settings_with_options(options).await?;

    if let Some(proxies) = cli.proxies {
        settings.proxy_file = Some(proxies);
    }

    match cli.command {
        Commands::Run { requests, output } => {
            if let Some(output) = output {
                settings.output_path = output;
            }
            run::cmd_run(&settings, &requests).await
        }
        Commands::Status => status::cmd_status(&settings).await,
        Commands::Solve { file } => captcha::cmd_solve(&settings, &file).await,
        Commands::Measure { samples } => captcha::cmd_measure(&settings, &samples).await,
        Commands::Gather { count } => gather::cmd_gather(&settings, count).await,
    }
}
