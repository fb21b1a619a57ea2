use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Free-form key/value pairs attached to system entries
pub type Extra = BTreeMap<String, serde_json::Value>;

/// Severity of a log entry, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four independent log streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Access,
    Media,
    Error,
    System,
}

impl StreamType {
    pub const ALL: [StreamType; 4] = [
        StreamType::Access,
        StreamType::Media,
        StreamType::Error,
        StreamType::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamType::Access => "access",
            StreamType::Media => "media",
            StreamType::Error => "error",
            StreamType::System => "system",
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts about one served request, supplied by the request-handling layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub raw_query: String,
    pub client_ip: String,
    pub user_agent: String,
    pub referrer: String,
    pub status_code: u16,
    #[serde(with = "duration_millis")]
    pub response_time: Duration,
    pub identity: Option<String>,
    pub file_size: Option<u64>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Path plus `?query` when a query string is present
    pub fn target(&self) -> String {
        if self.raw_query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.raw_query)
        }
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = ip.into();
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_response_time(mut self, response_time: Duration) -> Self {
        self.response_time = response_time;
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_query(mut self, raw_query: impl Into<String>) -> Self {
        self.raw_query = raw_query.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = Some(file_size);
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// A single record flowing through the pipeline.
///
/// The timestamp and stream type are fixed at construction. Numeric fields use
/// zero to mean "absent" and string fields use the empty string.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    timestamp: DateTime<Local>,
    stream: StreamType,
    pub level: LogLevel,
    pub ip: String,
    pub user_agent: String,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub response_time_ms: u64,
    pub username: String,
    pub file_size: u64,
    pub referrer: String,
    pub message: String,
    pub extra: Extra,
}

impl LogEntry {
    /// Create an empty entry stamped with the current local time
    pub fn new(stream: StreamType, level: LogLevel) -> Self {
        Self::at(stream, level, Local::now())
    }

    /// Create an empty entry with an explicit timestamp
    pub fn at(stream: StreamType, level: LogLevel, timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            stream,
            level,
            ip: String::new(),
            user_agent: String::new(),
            method: String::new(),
            path: String::new(),
            status_code: 0,
            response_time_ms: 0,
            username: String::new(),
            file_size: 0,
            referrer: String::new(),
            message: String::new(),
            extra: Extra::new(),
        }
    }

    /// Populate the request-derived fields from a request descriptor
    pub fn from_request(stream: StreamType, level: LogLevel, ctx: &RequestContext) -> Self {
        let mut entry = Self::new(stream, level);
        entry.ip = ctx.client_ip.clone();
        entry.user_agent = ctx.user_agent.clone();
        entry.method = ctx.method.clone();
        entry.path = ctx.path.clone();
        entry.referrer = ctx.referrer.clone();
        entry
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn stream(&self) -> StreamType {
        self.stream
    }
}
