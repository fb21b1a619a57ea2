use crate::logs::entry::{LogEntry, StreamType};
use chrono::SecondsFormat;
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write as _;
use tracing::warn;

/// Renders a [`LogEntry`] into a single line, without a trailing newline
pub trait Formatter: Send + Sync {
    fn format(&self, entry: &LogEntry) -> String;

    /// Rendering used when the line goes to an interactive console
    fn format_for_terminal(&self, entry: &LogEntry) -> String {
        self.format(entry)
    }
}

const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MEDIA_DATE_FORMAT: &str = "%Y-%m-%d";

/// Human-readable, stream-specific layout
#[derive(Debug, Clone)]
pub struct TextFormatter {
    pub timestamp_format: String,
    pub show_colors: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            show_colors: true,
        }
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_colors(show_colors: bool) -> Self {
        Self {
            show_colors,
            ..Self::default()
        }
    }

    fn render(&self, entry: &LogEntry, colors: bool) -> String {
        let mut line = String::with_capacity(128);
        let _ = write!(
            line,
            "[{}] {}",
            entry.timestamp().format(&self.timestamp_format),
            type_tag(entry.stream(), colors)
        );

        match entry.stream() {
            StreamType::Access => format_access(&mut line, entry),
            StreamType::Media => format_media(&mut line, entry),
            StreamType::Error => format_error(&mut line, entry),
            StreamType::System => format_system(&mut line, entry),
        }

        line
    }
}

impl Formatter for TextFormatter {
    fn format(&self, entry: &LogEntry) -> String {
        self.render(entry, false)
    }

    fn format_for_terminal(&self, entry: &LogEntry) -> String {
        self.render(entry, self.show_colors)
    }
}

fn type_tag(stream: StreamType, colors: bool) -> String {
    let tag = format!("[{}]", stream.as_str().to_uppercase());
    if !colors {
        return tag;
    }
    match stream {
        StreamType::Access => tag.cyan().to_string(),
        StreamType::Media => tag.magenta().to_string(),
        StreamType::Error => tag.red().to_string(),
        StreamType::System => tag.green().to_string(),
    }
}

fn format_access(line: &mut String, entry: &LogEntry) {
    let _ = write!(
        line,
        " IP:{} Method:{} Path:{}",
        entry.ip, entry.method, entry.path
    );
    if entry.status_code > 0 {
        let _ = write!(line, " Status:{}", entry.status_code);
    }
    if entry.response_time_ms > 0 {
        let _ = write!(line, " Time:{}ms", entry.response_time_ms);
    }
    if !entry.username.is_empty() {
        let _ = write!(line, " User:{}", entry.username);
    }
}

fn format_media(line: &mut String, entry: &LogEntry) {
    let user = if entry.username.is_empty() {
        "anonymous"
    } else {
        entry.username.as_str()
    };
    let _ = write!(
        line,
        " Time:{} IP:{} User:{} Path:{}",
        entry.timestamp().format(MEDIA_DATE_FORMAT),
        entry.ip,
        user,
        entry.path
    );
    if entry.file_size > 0 {
        let _ = write!(line, " Size:{}", human_size(entry.file_size));
    }
}

fn format_error(line: &mut String, entry: &LogEntry) {
    let _ = write!(line, " IP:{} Path:{}", entry.ip, entry.path);
    if !entry.message.is_empty() {
        let _ = write!(line, " Error:{}", entry.message);
    }
}

fn format_system(line: &mut String, entry: &LogEntry) {
    if !entry.message.is_empty() {
        let _ = write!(line, " {}", entry.message);
    }
    for (key, value) in &entry.extra {
        match value {
            serde_json::Value::String(s) => {
                let _ = write!(line, " {}:{}", key, s);
            }
            other => {
                let _ = write!(line, " {}:{}", key, other);
            }
        }
    }
}

/// Base-1024 size with one decimal place, e.g. `1.5 MB`
pub fn human_size(bytes: u64) -> String {
    const UNIT: u64 = 1024;
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < UNIT {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / UNIT as f64;
    let mut idx = 0;
    while value >= UNIT as f64 && idx < UNITS.len() - 1 {
        value /= UNIT as f64;
        idx += 1;
    }

    format!("{:.1} {}", value, UNITS[idx])
}

/// One JSON object per line with a fixed field order
#[derive(Debug, Default, Clone)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    timestamp: String,
    level: &'static str,
    #[serde(rename = "type")]
    stream: &'static str,
    ip: &'a str,
    method: &'a str,
    path: &'a str,
    status_code: u16,
    response_time: u64,
    username: &'a str,
    user_agent: &'a str,
    referrer: &'a str,
    file_size: u64,
    message: &'a str,
    extra: &'a crate::logs::entry::Extra,
}

impl Formatter for JsonFormatter {
    fn format(&self, entry: &LogEntry) -> String {
        let record = JsonRecord {
            timestamp: entry
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Millis, false),
            level: entry.level.as_str(),
            stream: entry.stream().as_str(),
            ip: &entry.ip,
            method: &entry.method,
            path: &entry.path,
            status_code: entry.status_code,
            response_time: entry.response_time_ms,
            username: &entry.username,
            user_agent: &entry.user_agent,
            referrer: &entry.referrer,
            file_size: entry.file_size,
            message: &entry.message,
            extra: &entry.extra,
        };
        encode_line(&record, entry.stream())
    }
}

/// Serialize one record, reporting a failure and yielding an empty line
fn encode_line<T: Serialize>(record: &T, stream: StreamType) -> String {
    match serde_json::to_string(record) {
        Ok(line) => line,
        Err(e) => {
            warn!(error = %e, stream = %stream, "failed to encode log entry as json");
            String::new()
        }
    }
}
