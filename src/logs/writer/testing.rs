use crate::error::{Result, StreamlogError};
use crate::logs::entry::LogEntry;
use crate::logs::format::Formatter;
use crate::logs::writer::Writer;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Captures entries in memory
#[derive(Default)]
pub struct MemoryWriter {
    pub entries: Mutex<Vec<LogEntry>>,
    pub closes: AtomicUsize,
    pub fail: AtomicBool,
}

impl MemoryWriter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let writer = Self::default();
        writer.fail.store(true, Ordering::SeqCst);
        Arc::new(writer)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Writer for MemoryWriter {
    fn write(&self, entry: &LogEntry) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StreamlogError::LogWriteError("sink unavailable".to_string()));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory byte sink usable as a console target
#[derive(Clone, Default)]
pub struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Renders only the message, padded to a fixed width
pub struct FixedWidthFormatter(pub usize);

impl Formatter for FixedWidthFormatter {
    fn format(&self, entry: &LogEntry) -> String {
        format!("{:<width$}", entry.message, width = self.0)
    }
}
