// Output formatting and display for CLI

use crate::cli::replay::ReplayStats;
use crate::config::LogConfig;
use crate::logs::StreamType;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// One line of the stream summary table
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct StreamRow {
    #[tabled(rename = "Stream")]
    pub stream: String,
    #[tabled(rename = "Enabled")]
    pub enabled: String,
    #[tabled(rename = "Filter")]
    pub filter: String,
    #[tabled(rename = "Destination")]
    pub destination: String,
}

/// Print an error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a success message
pub fn print_success_msg(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print the validated configuration: global settings, then one row per stream
pub fn print_config_summary(config: &LogConfig) {
    println!("\n{}", "Log Pipeline".bold().underline());
    println!();
    println!(
        "  {:<10} {}",
        "Enabled:".bold(),
        if config.enabled {
            "yes".green()
        } else {
            "no".red()
        }
    );
    println!("  {:<10} {}", "Level:".bold(), config.level);
    println!(
        "  {:<10} {}",
        "Format:".bold(),
        format!("{:?}", config.format).to_lowercase()
    );

    let mut table = Table::new(stream_rows(config));
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
}

/// Print the counters of a finished replay
pub fn print_replay_summary(stats: &ReplayStats, elapsed: Duration) {
    print_success_msg(&format!(
        "Replayed {} record(s) in {}",
        stats.total(),
        format_duration(&elapsed)
    ));
    println!("  {:<10} {}", "Routed:".bold(), stats.routed);
    if stats.skipped > 0 {
        println!(
            "  {:<10} {}",
            "Skipped:".bold(),
            stats.skipped.to_string().yellow()
        );
    }
    if stats.invalid > 0 {
        println!(
            "  {:<10} {}",
            "Invalid:".bold(),
            stats.invalid.to_string().red()
        );
    }
}

/// Summary row for every stream in the configuration
pub fn stream_rows(config: &LogConfig) -> Vec<StreamRow> {
    StreamType::ALL
        .iter()
        .map(|&stream| {
            let enabled = config.enabled && stream_enabled(config, stream);
            StreamRow {
                stream: stream.to_string(),
                enabled: if enabled { "yes" } else { "no" }.to_string(),
                filter: filter_description(config, stream),
                destination: if enabled {
                    destination(config, stream)
                } else {
                    "-".to_string()
                },
            }
        })
        .collect()
}

fn stream_enabled(config: &LogConfig, stream: StreamType) -> bool {
    match stream {
        StreamType::Access => config.access_log.enabled,
        StreamType::Media => config.media_log.enabled,
        StreamType::Error => config.error_log.enabled,
        StreamType::System => config.system_log.enabled,
    }
}

fn filter_description(config: &LogConfig, stream: StreamType) -> String {
    match stream {
        StreamType::Access => {
            let access = &config.access_log;
            let mut parts = Vec::new();
            if !access.exclude_paths.is_empty() {
                parts.push(format!("-{} path(s)", access.exclude_paths.len()));
            }
            if !access.include_paths.is_empty() {
                parts.push(format!("+{} path(s)", access.include_paths.len()));
            }
            if !access.exclude_status.is_empty() {
                parts.push(format!("-{} status", access.exclude_status.len()));
            }
            if !access.include_status.is_empty() {
                parts.push(format!("+{} status", access.include_status.len()));
            }
            if parts.is_empty() {
                "none".to_string()
            } else {
                parts.join(", ")
            }
        }
        StreamType::Media => "media files".to_string(),
        StreamType::Error | StreamType::System => "none".to_string(),
    }
}

fn destination(config: &LogConfig, stream: StreamType) -> String {
    let file = &config.output.file;
    let mut targets = Vec::new();

    if config.output.console.enabled {
        targets.push("console".to_string());
    }
    if file.enabled {
        let path = match stream {
            StreamType::Media => config.media_filename(),
            _ => file.filename.clone(),
        };
        let mode = if file.async_write {
            format!("async, {}", file.buffer_size)
        } else {
            "sync".to_string()
        };
        targets.push(format!(
            "{} ({} MB x {}, {})",
            path.display(),
            file.max_size_mb,
            file.max_files,
            mode
        ));
    }

    if targets.is_empty() {
        "console".to_string()
    } else {
        targets.join(" + ")
    }
}

/// Format a duration in human-readable format
fn format_duration(duration: &Duration) -> String {
    let millis = duration.as_millis();
    let secs = duration.as_secs();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        if secs > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}m", mins)
        }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins > 0 {
            format!("{}h {}m", hours, mins)
        } else {
            format!("{}h", hours)
        }
    }
}

/// Create a spinner for long operations
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a progress bar with success
pub fn finish_progress_success(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✓".green(), message));
}

/// Finish a progress bar with error
pub fn finish_progress_error(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✗".red(), message));
}
