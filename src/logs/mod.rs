// Logs module - request log pipeline: entries, filters, formatters, writers

mod entry;
mod filter;
mod format;
pub mod global;
mod logger;
mod manager;
mod writer;

pub use entry::{Extra, LogEntry, LogLevel, RequestContext, StreamType};
pub use filter::{CompositeFilter, Filter, FilterMode, MediaFilter, PathFilter, StatusCodeFilter};
pub use format::{human_size, Formatter, JsonFormatter, TextFormatter};
pub use logger::{Logger, StandardLogger};
pub use manager::LoggerManager;
pub use writer::{
    AsyncState, AsyncWriter, Clock, ConsoleWriter, FileWriter, MultiWriter, RotatingFileWriter,
    SystemClock, Writer, DATE_PLACEHOLDER, DEFAULT_MAX_LOG_SIZE,
};
