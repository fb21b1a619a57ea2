// CLI module - User-facing command-line interface

mod output;
pub mod replay;

use crate::config::LogConfig;
use crate::logs::global;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Streamlog - request log pipeline for file-serving web services
#[derive(Parser)]
#[command(name = "streamlog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and show where each stream writes
    Check {
        /// Path to the configuration file (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Route newline-delimited JSON request records through the pipeline
    Replay {
        /// Path to the configuration file (.toml or .json)
        #[arg(short, long)]
        config: PathBuf,

        /// Records to replay (defaults to stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

impl Cli {
    /// Run the CLI application
    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        cli.execute()
    }

    /// Execute the parsed command
    fn execute(&self) -> Result<()> {
        match &self.command {
            Commands::Check { config } => check(config),
            Commands::Replay { config, input } => replay(config, input.as_deref()),
        }
    }
}

fn load_config(path: &Path) -> Result<LogConfig> {
    LogConfig::from_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn check(path: &Path) -> Result<()> {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            return Err(e);
        }
    };

    output::print_success_msg(&format!("{} is valid", path.display()));
    output::print_config_summary(&config);
    Ok(())
}

fn replay(config_path: &Path, input: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let manager = global::init(config);

    // Interrupt drains the async writers before exiting
    ctrlc::set_handler(|| {
        let _ = global::close();
        std::process::exit(0);
    })
    .ok();

    let reader: Box<dyn BufRead> = match input {
        Some(path) => {
            output::print_info(&format!("Replaying {}", path.display()));
            let file = File::open(path)
                .with_context(|| format!("failed to open input {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let started = Instant::now();
    let pb = output::create_progress_bar("Replaying records...");
    let result = replay::replay(&manager, reader, |stats| {
        pb.set_message(format!("Replaying records... {}", stats.total()));
    });
    drop(manager);

    let stats = match result {
        Ok(stats) => {
            output::finish_progress_success(pb, "Replay finished");
            stats
        }
        Err(e) => {
            output::finish_progress_error(pb, "Replay failed");
            let _ = global::close();
            return Err(e).context("failed to read replay input");
        }
    };

    global::close().context("failed to close log pipeline")?;
    output::print_replay_summary(&stats, started.elapsed());
    Ok(())
}
