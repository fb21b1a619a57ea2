use crate::error::{Result, StreamlogError};
use crate::logs::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Line format written by every sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Master switch; when false no stream is built
    pub enabled: bool,
    /// Minimum severity recorded
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: OutputConfig,
    pub access_log: AccessLogConfig,
    pub media_log: MediaLogConfig,
    pub error_log: StreamToggle,
    pub system_log: StreamToggle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub console: ConsoleConfig,
    pub file: FileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    pub colors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub enabled: bool,
    pub filename: PathBuf,
    /// Rotation threshold in megabytes
    pub max_size_mb: u64,
    /// Number of rotated backups kept
    pub max_files: usize,
    /// Queue writes on a background worker
    #[serde(rename = "async")]
    pub async_write: bool,
    /// Queue capacity when `async` is set
    pub buffer_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessLogConfig {
    pub enabled: bool,
    pub exclude_paths: Vec<String>,
    pub include_paths: Vec<String>,
    pub exclude_status: Vec<u16>,
    pub include_status: Vec<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaLogConfig {
    pub enabled: bool,
    /// Dedicated media file; defaults to `media_access.log` next to the main log
    pub filename: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamToggle {
    pub enabled: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
            format: LogFormat::Text,
            output: OutputConfig::default(),
            access_log: AccessLogConfig::default(),
            media_log: MediaLogConfig::default(),
            error_log: StreamToggle::default(),
            system_log: StreamToggle::default(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            colors: true,
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filename: PathBuf::from("./logs/streamlog.log"),
            max_size_mb: 100,
            max_files: 10,
            async_write: true,
            buffer_size: 1000,
        }
    }
}

impl Default for AccessLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exclude_paths: vec![
                "/ping".to_string(),
                "/health".to_string(),
                "/favicon.ico".to_string(),
            ],
            include_paths: Vec::new(),
            exclude_status: Vec::new(),
            include_status: Vec::new(),
        }
    }
}

impl Default for MediaLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filename: None,
        }
    }
}

impl Default for StreamToggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl FileConfig {
    /// Rotation threshold in bytes
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }
}

impl LogConfig {
    /// Load a configuration file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StreamlogError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(StreamlogError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn parse_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| StreamlogError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    pub fn parse_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| StreamlogError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let file = &self.output.file;
        if file.enabled {
            if file.filename.as_os_str().is_empty() {
                return Err(StreamlogError::MissingConfigField(
                    "output.file.filename".to_string(),
                ));
            }
            if file.max_size_mb == 0 {
                return Err(StreamlogError::ConfigValidationError(
                    "output.file.max_size_mb must be at least 1".to_string(),
                ));
            }
            if file.max_files == 0 {
                return Err(StreamlogError::ConfigValidationError(
                    "output.file.max_files must be at least 1".to_string(),
                ));
            }
            if file.async_write && file.buffer_size == 0 {
                return Err(StreamlogError::ConfigValidationError(
                    "output.file.buffer_size must be at least 1 when async is enabled".to_string(),
                ));
            }
        }

        let access = &self.access_log;
        if let Some(code) = access
            .exclude_status
            .iter()
            .chain(access.include_status.iter())
            .find(|c| !(100..=599).contains(*c))
        {
            return Err(StreamlogError::ConfigValidationError(format!(
                "Invalid HTTP status code in access_log: {}",
                code
            )));
        }

        Ok(())
    }

    /// Path of the dedicated media log file
    pub fn media_filename(&self) -> PathBuf {
        if let Some(ref filename) = self.media_log.filename {
            return filename.clone();
        }
        match self.output.file.filename.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join("media_access.log"),
            _ => PathBuf::from("media_access.log"),
        }
    }
}
