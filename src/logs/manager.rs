use crate::config::{FileConfig, LogConfig, LogFormat};
use crate::error::{Result, StreamlogError};
use crate::logs::entry::StreamType;
use crate::logs::filter::{
    CompositeFilter, Filter, FilterMode, MediaFilter, PathFilter, StatusCodeFilter,
};
use crate::logs::format::{Formatter, JsonFormatter, TextFormatter};
use crate::logs::logger::{Logger, StandardLogger};
use crate::logs::writer::{AsyncWriter, ConsoleWriter, FileWriter, MultiWriter, Writer};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// LoggerManager owns one logger per enabled stream, built from a
/// configuration snapshot
pub struct LoggerManager {
    state: RwLock<ManagerState>,
}

struct ManagerState {
    loggers: HashMap<StreamType, Arc<dyn Logger>>,
    config: LogConfig,
    closed: bool,
}

impl LoggerManager {
    /// Build every logger the configuration enables.
    ///
    /// Sinks that cannot be opened degrade to the console; construction
    /// itself never fails.
    pub fn new(config: LogConfig) -> Self {
        let loggers = build_loggers(&config);
        Self {
            state: RwLock::new(ManagerState {
                loggers,
                config,
                closed: false,
            }),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ManagerState> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ManagerState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Logger for a stream, if that stream is enabled and the manager is open
    pub fn get_logger(&self, stream: StreamType) -> Option<Arc<dyn Logger>> {
        self.read_state().loggers.get(&stream).cloned()
    }

    pub fn access_logger(&self) -> Option<Arc<dyn Logger>> {
        self.get_logger(StreamType::Access)
    }

    pub fn media_logger(&self) -> Option<Arc<dyn Logger>> {
        self.get_logger(StreamType::Media)
    }

    pub fn error_logger(&self) -> Option<Arc<dyn Logger>> {
        self.get_logger(StreamType::Error)
    }

    pub fn system_logger(&self) -> Option<Arc<dyn Logger>> {
        self.get_logger(StreamType::System)
    }

    /// Snapshot of the active configuration
    pub fn config(&self) -> LogConfig {
        self.read_state().config.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.read_state().closed
    }

    /// Close every current logger and rebuild the whole set from `config`
    pub fn update_config(&self, config: LogConfig) -> Result<()> {
        let mut state = self.write_state();
        if state.closed {
            return Err(StreamlogError::ManagerClosed);
        }

        let _ = close_loggers(&state.loggers);
        state.loggers = build_loggers(&config);
        state.config = config;

        info!(streams = state.loggers.len(), "log pipeline reconfigured");
        Ok(())
    }

    /// Close every logger and release them. Returns the last close error.
    pub fn close(&self) -> Result<()> {
        let mut state = self.write_state();
        if state.closed {
            return Ok(());
        }

        let result = close_loggers(&state.loggers);
        state.loggers.clear();
        state.closed = true;

        debug!("log pipeline closed");
        result
    }
}

impl Drop for LoggerManager {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn close_loggers(loggers: &HashMap<StreamType, Arc<dyn Logger>>) -> Result<()> {
    let mut last_err = None;
    for (stream, logger) in loggers {
        if let Err(e) = logger.close() {
            warn!(error = %e, stream = %stream, "failed to close logger");
            last_err = Some(e);
        }
    }
    match last_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn build_loggers(config: &LogConfig) -> HashMap<StreamType, Arc<dyn Logger>> {
    let mut loggers: HashMap<StreamType, Arc<dyn Logger>> = HashMap::new();
    if !config.enabled {
        return loggers;
    }

    let formatter = create_formatter(config);
    let shared = create_writer(config, formatter.clone());

    let mut add = |stream: StreamType,
                   filter: Option<Arc<dyn Filter>>,
                   writer: Arc<dyn Writer>| {
        let logger = StandardLogger::with_components(filter, formatter.clone(), writer);
        logger.set_min_level(config.level);
        loggers.insert(stream, Arc::new(logger));
    };

    if config.access_log.enabled {
        add(
            StreamType::Access,
            Some(create_access_filter(config)),
            shared.clone(),
        );
    }

    if config.media_log.enabled {
        let media_writer = create_media_writer(config, formatter.clone(), &shared);
        let media_filter: Arc<dyn Filter> = Arc::new(MediaFilter::new());
        add(StreamType::Media, Some(media_filter), media_writer);
    }

    if config.error_log.enabled {
        add(StreamType::Error, None, shared.clone());
    }

    if config.system_log.enabled {
        add(StreamType::System, None, shared);
    }

    loggers
}

fn create_formatter(config: &LogConfig) -> Arc<dyn Formatter> {
    match config.format {
        LogFormat::Json => Arc::new(JsonFormatter::new()),
        LogFormat::Text => Arc::new(TextFormatter::with_colors(config.output.console.colors)),
    }
}

/// Size-rotating file sink, behind a queue when `async` is set
fn create_file_writer(
    path: &Path,
    file: &FileConfig,
    formatter: Arc<dyn Formatter>,
) -> Result<Arc<dyn Writer>> {
    let writer: Arc<dyn Writer> = Arc::new(FileWriter::new(
        path,
        file.max_size_bytes(),
        file.max_files,
        formatter,
    )?);

    if file.async_write {
        Ok(Arc::new(AsyncWriter::new(writer, file.buffer_size)?))
    } else {
        Ok(writer)
    }
}

/// Writer shared by the access, error and system streams
fn create_writer(config: &LogConfig, formatter: Arc<dyn Formatter>) -> Arc<dyn Writer> {
    let mut writers: Vec<Arc<dyn Writer>> = Vec::new();

    if config.output.console.enabled {
        writers.push(Arc::new(ConsoleWriter::with_formatter(formatter.clone())));
    }

    let file = &config.output.file;
    if file.enabled {
        match create_file_writer(&file.filename, file, formatter.clone()) {
            Ok(writer) => writers.push(writer),
            Err(e) => warn!(
                error = %e,
                path = %file.filename.display(),
                "failed to open log file, falling back to console"
            ),
        }
    }

    match writers.len() {
        0 => Arc::new(ConsoleWriter::with_formatter(formatter)),
        1 => writers.remove(0),
        _ => Arc::new(MultiWriter::new(writers)),
    }
}

/// Media stream writer: its own file plus the console, or the shared writer
/// when no media file can be used
fn create_media_writer(
    config: &LogConfig,
    formatter: Arc<dyn Formatter>,
    shared: &Arc<dyn Writer>,
) -> Arc<dyn Writer> {
    let file = &config.output.file;
    if !file.enabled {
        return shared.clone();
    }

    let path = config.media_filename();
    let media_file = match create_file_writer(&path, file, formatter.clone()) {
        Ok(writer) => writer,
        Err(e) => {
            warn!(
                error = %e,
                path = %path.display(),
                "failed to open media log file, using the shared writer"
            );
            return shared.clone();
        }
    };

    if config.output.console.enabled {
        let console: Arc<dyn Writer> = Arc::new(ConsoleWriter::with_formatter(formatter));
        Arc::new(MultiWriter::new(vec![media_file, console]))
    } else {
        media_file
    }
}

/// Path and status rules for the access stream, combined with AND
fn create_access_filter(config: &LogConfig) -> Arc<dyn Filter> {
    let access = &config.access_log;

    let mut path_filter = PathFilter::new();
    for path in &access.exclude_paths {
        path_filter.add_exclude_path(path.clone());
    }
    for path in &access.include_paths {
        path_filter.add_include_path(path.clone());
    }

    let mut status_filter = StatusCodeFilter::new();
    for &code in &access.exclude_status {
        status_filter.add_exclude_status(code);
    }
    for &code in &access.include_status {
        status_filter.add_include_status(code);
    }

    Arc::new(
        CompositeFilter::new(FilterMode::And)
            .with_filter(Arc::new(path_filter))
            .with_filter(Arc::new(status_filter)),
    )
}
