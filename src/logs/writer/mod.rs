// Writers - sinks that persist formatted log entries

mod async_writer;
mod console;
mod file;
mod multi;
mod rotating;

#[cfg(test)]
pub(crate) mod testing;

pub use async_writer::{AsyncState, AsyncWriter};
pub use console::ConsoleWriter;
pub use file::{FileWriter, DEFAULT_MAX_LOG_SIZE};
pub use multi::MultiWriter;
pub use rotating::{Clock, RotatingFileWriter, SystemClock, DATE_PLACEHOLDER};

use crate::error::{Result, StreamlogError};
use crate::logs::entry::LogEntry;
use crate::logs::format::Formatter;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// A sink for log entries
pub trait Writer: Send + Sync {
    /// Persist one entry
    fn write(&self, entry: &LogEntry) -> Result<()>;

    /// Release the sink's resources. Calling it more than once is harmless.
    fn close(&self) -> Result<()>;

    /// Replace the formatter used to render entries
    fn set_formatter(&self, _formatter: Arc<dyn Formatter>) {}
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| StreamlogError::LogWriteError("writer lock poisoned".to_string()))
}

/// Slot holding a swappable formatter
pub(crate) struct FormatterSlot(RwLock<Arc<dyn Formatter>>);

impl FormatterSlot {
    pub(crate) fn new(formatter: Arc<dyn Formatter>) -> Self {
        Self(RwLock::new(formatter))
    }

    pub(crate) fn get(&self) -> Arc<dyn Formatter> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub(crate) fn set(&self, formatter: Arc<dyn Formatter>) {
        match self.0.write() {
            Ok(mut guard) => *guard = formatter,
            Err(poisoned) => *poisoned.into_inner() = formatter,
        }
    }
}

/// Create the parent directory of a log file if it doesn't exist
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StreamlogError::LogDirectoryError(format!("{}: {}", parent.display(), e))
            })?;
        }
    }
    Ok(())
}

/// Open a log file in append mode, creating it if needed
pub(crate) fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StreamlogError::LogFileError(format!("{}: {}", path.display(), e)))
}
