// Replay - feed recorded request events through a logger manager

use crate::error::Result;
use crate::logs::{Extra, LogLevel, LoggerManager, RequestContext, StreamType};
use serde::Deserialize;
use std::io::BufRead;
use tracing::warn;

/// One newline-delimited JSON event
#[derive(Debug, Deserialize)]
pub struct ReplayRecord {
    #[serde(default = "default_stream")]
    pub stream: StreamType,
    #[serde(flatten)]
    pub request: RequestContext,
    #[serde(default)]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub extra: Extra,
}

fn default_stream() -> StreamType {
    StreamType::Access
}

/// Outcome counters for one replay run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    /// Records handed to a logger
    pub routed: u64,
    /// Records whose stream is disabled
    pub skipped: u64,
    /// Lines that were not valid records
    pub invalid: u64,
}

impl ReplayStats {
    pub fn total(&self) -> u64 {
        self.routed + self.skipped + self.invalid
    }
}

/// Route a single record to the logger of its stream.
///
/// Returns false when that stream has no logger.
pub fn route(manager: &LoggerManager, record: ReplayRecord) -> bool {
    let Some(logger) = manager.get_logger(record.stream) else {
        return false;
    };

    let ctx = &record.request;
    match record.stream {
        StreamType::Access => logger.log_access(ctx),
        StreamType::Media => logger.log_media(ctx, record.username.as_deref(), 0),
        StreamType::Error => logger.log_error(ctx, None, &record.message),
        StreamType::System => logger.log_system(
            record.level.unwrap_or_default(),
            &record.message,
            record.extra,
        ),
    }
    true
}

/// Read records line by line until EOF, calling `progress` after each line
pub fn replay<R: BufRead>(
    manager: &LoggerManager,
    reader: R,
    mut progress: impl FnMut(&ReplayStats),
) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<ReplayRecord>(line) {
            Ok(record) => {
                if route(manager, record) {
                    stats.routed += 1;
                } else {
                    stats.skipped += 1;
                }
            }
            Err(e) => {
                warn!(line = index + 1, error = %e, "skipping invalid replay record");
                stats.invalid += 1;
            }
        }

        progress(&stats);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogConfig;
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn manager_in(dir: &std::path::Path) -> LoggerManager {
        let mut config = LogConfig::default();
        config.output.console.enabled = false;
        config.output.file.filename = dir.join("replay.log");
        config.output.file.async_write = false;
        config.media_log.enabled = false;
        LoggerManager::new(config)
    }

    #[test]
    fn test_record_defaults() {
        let record: ReplayRecord =
            serde_json::from_str(r#"{"method":"GET","path":"/api/me","status_code":200}"#)
                .unwrap();
        assert_eq!(record.stream, StreamType::Access);
        assert_eq!(record.request.path, "/api/me");
        assert_eq!(record.request.status_code, 200);
        assert!(record.level.is_none());
    }

    #[test]
    fn test_replay_routes_by_stream() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_in(temp_dir.path());

        let input = [
            r#"{"method":"GET","path":"/api/fs/list","status_code":200,"response_time":12}"#,
            r#"{"stream":"system","level":"warn","message":"cache cold","extra":{"size":3}}"#,
            r#"{"stream":"error","method":"POST","path":"/api/fs/put","message":"quota"}"#,
            r#"{"stream":"media","path":"/d/a.png"}"#,
            "",
            "not json",
        ]
        .join("\n");

        let mut calls = 0;
        let stats = replay(&manager, Cursor::new(input), |_| calls += 1).unwrap();
        manager.close().unwrap();

        assert_eq!(
            stats,
            ReplayStats {
                routed: 3,
                skipped: 1,
                invalid: 1
            }
        );
        assert_eq!(stats.total(), 5);
        assert_eq!(calls, 5);

        let contents = fs::read_to_string(temp_dir.path().join("replay.log")).unwrap();
        assert!(contents.contains("Path:/api/fs/list Status:200 Time:12ms"));
        assert!(contents.contains("cache cold size:3"));
        assert!(contents.contains("Error:quota"));
    }
}
