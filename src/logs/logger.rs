use crate::error::Result;
use crate::logs::entry::{Extra, LogEntry, LogLevel, RequestContext, StreamType};
use crate::logs::filter::{CompositeFilter, Filter, FilterMode};
use crate::logs::format::{Formatter, TextFormatter};
use crate::logs::writer::{ConsoleWriter, Writer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Per-stream logging façade.
///
/// The typed operations never fail: a rejected or undeliverable entry is
/// silently dropped so the request being served is never affected.
pub trait Logger: Send + Sync {
    /// Write a pre-built entry, subject to the enabled flag and, for system
    /// entries, the level gate
    fn log(&self, entry: LogEntry) -> Result<()>;

    fn log_access(&self, ctx: &RequestContext);

    /// `username` falls back to the request identity when absent or empty,
    /// `file_size` falls back to the request's file size when zero
    fn log_media(&self, ctx: &RequestContext, username: Option<&str>, file_size: u64);

    fn log_error(&self, ctx: &RequestContext, err: Option<&dyn std::error::Error>, message: &str);

    fn log_system(&self, level: LogLevel, message: &str, extra: Extra);

    fn set_filter(&self, filter: Option<Arc<dyn Filter>>);

    /// Install a new writer; the previous one is closed
    fn set_writer(&self, writer: Arc<dyn Writer>);

    fn set_formatter(&self, formatter: Arc<dyn Formatter>);

    fn set_enabled(&self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Close the bound writer
    fn close(&self) -> Result<()>;
}

struct Components {
    filter: Option<Arc<dyn Filter>>,
    formatter: Arc<dyn Formatter>,
    writer: Arc<dyn Writer>,
    min_level: LogLevel,
}

/// Logger binding one filter, one formatter and one writer.
///
/// The formatter is pushed down into the writer whenever either changes, so
/// every sink behind this logger renders with it.
pub struct StandardLogger {
    components: RwLock<Components>,
    enabled: AtomicBool,
}

impl StandardLogger {
    /// Console logger with the text formatter and an empty AND filter chain
    pub fn new() -> Self {
        Self::with_components(
            Some(Arc::new(CompositeFilter::new(FilterMode::And))),
            Arc::new(TextFormatter::new()),
            Arc::new(ConsoleWriter::new()),
        )
    }

    pub fn with_components(
        filter: Option<Arc<dyn Filter>>,
        formatter: Arc<dyn Formatter>,
        writer: Arc<dyn Writer>,
    ) -> Self {
        writer.set_formatter(formatter.clone());
        Self {
            components: RwLock::new(Components {
                filter,
                formatter,
                writer,
                min_level: LogLevel::Debug,
            }),
            enabled: AtomicBool::new(true),
        }
    }

    /// Drop system entries less severe than `level`; request streams are not gated
    pub fn set_min_level(&self, level: LogLevel) {
        self.write_components().min_level = level;
    }

    pub fn min_level(&self) -> LogLevel {
        self.read_components().min_level
    }

    pub fn filter(&self) -> Option<Arc<dyn Filter>> {
        self.read_components().filter.clone()
    }

    pub fn formatter(&self) -> Arc<dyn Formatter> {
        self.read_components().formatter.clone()
    }

    pub fn writer(&self) -> Arc<dyn Writer> {
        self.read_components().writer.clone()
    }

    fn read_components(&self) -> RwLockReadGuard<'_, Components> {
        self.components
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_components(&self) -> RwLockWriteGuard<'_, Components> {
        self.components
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Consult the filter; `false` means the event is not recorded
    fn admits(&self, ctx: &RequestContext, stream: StreamType) -> bool {
        match self.filter() {
            Some(filter) => filter.should_log(ctx, stream),
            None => true,
        }
    }

    fn dispatch(&self, entry: LogEntry) {
        let stream = entry.stream();
        if let Err(e) = self.log(entry) {
            debug!(error = %e, stream = %stream, "log entry dropped");
        }
    }
}

impl Default for StandardLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn same_writer(a: &Arc<dyn Writer>, b: &Arc<dyn Writer>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl Logger for StandardLogger {
    fn log(&self, entry: LogEntry) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let writer = {
            let components = self.read_components();
            if entry.stream() == StreamType::System && entry.level < components.min_level {
                return Ok(());
            }
            components.writer.clone()
        };

        writer.write(&entry)
    }

    fn log_access(&self, ctx: &RequestContext) {
        if !self.is_enabled() || !self.admits(ctx, StreamType::Access) {
            return;
        }

        let mut entry = LogEntry::from_request(StreamType::Access, LogLevel::Info, ctx);
        entry.status_code = ctx.status_code;
        entry.response_time_ms = ctx.response_time.as_millis() as u64;
        entry.username = ctx.identity.clone().unwrap_or_default();

        self.dispatch(entry);
    }

    fn log_media(&self, ctx: &RequestContext, username: Option<&str>, file_size: u64) {
        if !self.is_enabled() || !self.admits(ctx, StreamType::Media) {
            return;
        }

        let mut entry = LogEntry::from_request(StreamType::Media, LogLevel::Info, ctx);
        entry.username = match username.filter(|u| !u.is_empty()) {
            Some(name) => name.to_string(),
            None => ctx.identity.clone().unwrap_or_default(),
        };
        entry.file_size = if file_size > 0 {
            file_size
        } else {
            ctx.file_size.unwrap_or(0)
        };

        self.dispatch(entry);
    }

    fn log_error(&self, ctx: &RequestContext, err: Option<&dyn std::error::Error>, message: &str) {
        if !self.is_enabled() || !self.admits(ctx, StreamType::Error) {
            return;
        }

        let mut entry = LogEntry::from_request(StreamType::Error, LogLevel::Error, ctx);
        entry.username = ctx.identity.clone().unwrap_or_default();
        entry.message = match err {
            Some(err) if message.is_empty() => err.to_string(),
            Some(err) => format!("{}: {}", message, err),
            None => message.to_string(),
        };

        self.dispatch(entry);
    }

    fn log_system(&self, level: LogLevel, message: &str, extra: Extra) {
        if !self.is_enabled() || !self.admits(&RequestContext::default(), StreamType::System) {
            return;
        }

        let mut entry = LogEntry::new(StreamType::System, level);
        entry.message = message.to_string();
        entry.extra = extra;

        self.dispatch(entry);
    }

    fn set_filter(&self, filter: Option<Arc<dyn Filter>>) {
        self.write_components().filter = filter;
    }

    fn set_writer(&self, writer: Arc<dyn Writer>) {
        let mut components = self.write_components();
        writer.set_formatter(components.formatter.clone());

        let previous = std::mem::replace(&mut components.writer, writer);
        if !same_writer(&previous, &components.writer) {
            if let Err(e) = previous.close() {
                debug!(error = %e, "failed to close replaced log writer");
            }
        }
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        let mut components = self.write_components();
        components.writer.set_formatter(formatter.clone());
        components.formatter = formatter;
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<()> {
        self.writer().close()
    }
}
