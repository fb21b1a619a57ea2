use crate::error::{Result, StreamlogError};
use crate::logs::entry::LogEntry;
use crate::logs::format::Formatter;
use crate::logs::writer::{ensure_parent_dir, lock, open_append, FormatterSlot, Writer};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Default maximum log file size before rotation (100MB)
pub const DEFAULT_MAX_LOG_SIZE: u64 = 100 * 1024 * 1024;

/// Size-rotating file writer.
///
/// The active file lives at `path`; rotated backups are `path.1` (newest)
/// through `path.N` where N is `max_files`.
pub struct FileWriter {
    /// Path to the active log file
    path: PathBuf,
    /// Maximum size in bytes before rotation
    max_size: u64,
    /// Number of numbered backups to keep
    max_files: usize,
    formatter: FormatterSlot,
    state: Mutex<FileState>,
}

struct FileState {
    file: Option<File>,
    current_size: u64,
}

impl FileWriter {
    /// Open (or create) the active log file, creating its directory if needed
    pub fn new(
        path: impl AsRef<Path>,
        max_size: u64,
        max_files: usize,
        formatter: Arc<dyn Formatter>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        ensure_parent_dir(&path)?;

        let file = open_append(&path)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        debug!(path = %path.display(), current_size, "opened log file");

        Ok(Self {
            path,
            max_size,
            max_files: max_files.max(1),
            formatter: FormatterSlot::new(formatter),
            state: Mutex::new(FileState {
                file: Some(file),
                current_size,
            }),
        })
    }

    /// Get the path to the active log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the maximum log file size before rotation
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Bytes written to the active file since it was opened or rotated
    pub fn current_size(&self) -> u64 {
        lock(&self.state).map(|s| s.current_size).unwrap_or(0)
    }

    /// Path of the n-th numbered backup
    pub fn backup_path(&self, n: usize) -> PathBuf {
        backup_path(&self.path, n)
    }

    fn rotate(&self, state: &mut FileState) -> Result<()> {
        if let Some(file) = state.file.take() {
            let _ = file.sync_all();
        }

        let shifted = self.shift_backups();

        // Reopen the active file even when shifting failed so later writes still land
        let file = open_append(&self.path)?;
        state.current_size = match shifted {
            Ok(()) => 0,
            Err(_) => file.metadata().map(|m| m.len()).unwrap_or(0),
        };
        state.file = Some(file);

        if shifted.is_ok() {
            debug!(path = %self.path.display(), "rotated log file");
        }
        shifted
    }

    fn shift_backups(&self) -> Result<()> {
        let oldest = self.backup_path(self.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest).map_err(|e| {
                StreamlogError::LogRotationError(format!(
                    "failed to remove {}: {}",
                    oldest.display(),
                    e
                ))
            })?;
        }

        for i in (1..self.max_files).rev() {
            let from = self.backup_path(i);
            if !from.exists() {
                continue;
            }
            let to = self.backup_path(i + 1);
            if let Err(e) = fs::rename(&from, &to) {
                warn!(
                    error = %e,
                    from = %from.display(),
                    to = %to.display(),
                    "failed to shift log backup"
                );
            }
        }

        fs::rename(&self.path, self.backup_path(1)).map_err(|e| {
            StreamlogError::LogRotationError(format!(
                "failed to rename {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl Writer for FileWriter {
    fn write(&self, entry: &LogEntry) -> Result<()> {
        let mut content = self.formatter.get().format(entry);
        content.push('\n');
        let len = content.len() as u64;

        let mut state = lock(&self.state)?;
        if state.file.is_none() {
            return Err(StreamlogError::WriterClosed);
        }

        if state.current_size > 0 && state.current_size + len > self.max_size {
            self.rotate(&mut state)?;
        }

        let file = state.file.as_mut().ok_or(StreamlogError::WriterClosed)?;
        file.write_all(content.as_bytes())
            .map_err(|e| StreamlogError::LogWriteError(e.to_string()))?;
        file.sync_all()
            .map_err(|e| StreamlogError::LogWriteError(format!("failed to sync: {}", e)))?;

        state.current_size += len;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = lock(&self.state)?;
        if let Some(file) = state.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.formatter.set(formatter);
    }
}

/// `app.log` -> `app.log.3`
fn backup_path(base: &Path, n: usize) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(format!(".{}", n));
    PathBuf::from(path)
}
