use crate::error::{Result, StreamlogError};
use crate::logs::entry::LogEntry;
use crate::logs::format::Formatter;
use crate::logs::writer::{ensure_parent_dir, lock, open_append, FormatterSlot, Writer};
use chrono::{Local, NaiveDate};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Placeholder replaced by the calendar date in a file pattern
pub const DATE_PLACEHOLDER: &str = "{date}";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the current calendar date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Date-rotating file writer: one file per calendar day.
///
/// `pattern` contains a `{date}` placeholder, e.g. `logs/access-{date}.log`.
/// A pattern without one gets `.{date}` appended.
pub struct RotatingFileWriter {
    pattern: String,
    /// Number of dated files to keep, 0 keeps everything
    max_files: usize,
    clock: Arc<dyn Clock>,
    formatter: FormatterSlot,
    state: Mutex<DatedState>,
}

struct DatedState {
    file: Option<File>,
    current_date: Option<NaiveDate>,
    closed: bool,
}

impl RotatingFileWriter {
    pub fn new(
        pattern: impl Into<String>,
        max_files: usize,
        formatter: Arc<dyn Formatter>,
    ) -> Result<Self> {
        Self::with_clock(pattern, max_files, formatter, Arc::new(SystemClock))
    }

    pub fn with_clock(
        pattern: impl Into<String>,
        max_files: usize,
        formatter: Arc<dyn Formatter>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut pattern = pattern.into();
        if !pattern.contains(DATE_PLACEHOLDER) {
            pattern = format!("{}.{}", pattern, DATE_PLACEHOLDER);
        }

        let writer = Self {
            pattern,
            max_files,
            clock,
            formatter: FormatterSlot::new(formatter),
            state: Mutex::new(DatedState {
                file: None,
                current_date: None,
                closed: false,
            }),
        };

        {
            let mut state = lock(&writer.state)?;
            writer.open_current(&mut state)?;
        }

        Ok(writer)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// File path for a given date
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        PathBuf::from(
            self.pattern
                .replacen(DATE_PLACEHOLDER, &date.format(DATE_FORMAT).to_string(), 1),
        )
    }

    /// Date of the currently open file
    pub fn current_date(&self) -> Option<NaiveDate> {
        lock(&self.state).ok().and_then(|s| s.current_date)
    }

    /// Switch to today's file if the date changed or nothing is open yet
    fn open_current(&self, state: &mut DatedState) -> Result<()> {
        let today = self.clock.today();
        if state.current_date == Some(today) && state.file.is_some() {
            return Ok(());
        }

        if let Some(old) = state.file.take() {
            let _ = old.sync_all();
        }

        let path = self.path_for(today);
        ensure_parent_dir(&path)?;
        state.file = Some(open_append(&path)?);
        state.current_date = Some(today);

        debug!(path = %path.display(), "opened dated log file");

        if self.max_files > 0 {
            spawn_prune(self.pattern.clone(), self.max_files);
        }
        Ok(())
    }
}

impl Writer for RotatingFileWriter {
    fn write(&self, entry: &LogEntry) -> Result<()> {
        let mut content = self.formatter.get().format(entry);
        content.push('\n');

        let mut state = lock(&self.state)?;
        if state.closed {
            return Err(StreamlogError::WriterClosed);
        }
        self.open_current(&mut state)?;

        let file = state.file.as_mut().ok_or(StreamlogError::WriterClosed)?;
        file.write_all(content.as_bytes())
            .map_err(|e| StreamlogError::LogWriteError(e.to_string()))?;
        file.sync_all()
            .map_err(|e| StreamlogError::LogWriteError(format!("failed to sync: {}", e)))?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = lock(&self.state)?;
        state.closed = true;
        if let Some(file) = state.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.formatter.set(formatter);
    }
}

fn spawn_prune(pattern: String, keep: usize) {
    let spawned = std::thread::Builder::new()
        .name("streamlog-prune".to_string())
        .spawn(move || {
            if let Err(e) = prune_dated_files(&pattern, keep) {
                warn!(error = %e, pattern = %pattern, "failed to prune old log files");
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to spawn log prune thread");
    }
}

/// Remove dated files beyond the newest `keep`
pub(crate) fn prune_dated_files(pattern: &str, keep: usize) -> Result<usize> {
    let Some((prefix, suffix)) = pattern.split_once(DATE_PLACEHOLDER) else {
        return Ok(0);
    };

    let (dir, name_prefix) = match prefix.rfind('/') {
        Some(idx) => (Path::new(&prefix[..idx.max(1)]), &prefix[idx + 1..]),
        None => (Path::new("."), prefix),
    };

    let mut dated: Vec<(NaiveDate, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        let Some(middle) = name
            .strip_prefix(name_prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
        else {
            continue;
        };
        if let Ok(date) = NaiveDate::parse_from_str(middle, DATE_FORMAT) {
            dated.push((date, entry.path()));
        }
    }

    if dated.len() <= keep {
        return Ok(0);
    }

    // Oldest first
    dated.sort();
    let excess = dated.len() - keep;
    for (_, path) in dated.iter().take(excess) {
        debug!(path = %path.display(), "pruning old dated log file");
        fs::remove_file(path)?;
    }
    Ok(excess)
}
