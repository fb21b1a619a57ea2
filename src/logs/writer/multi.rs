use crate::error::Result;
use crate::logs::entry::LogEntry;
use crate::logs::format::Formatter;
use crate::logs::writer::Writer;
use std::sync::Arc;
use tracing::warn;

/// Fans each entry out to every member writer, in order.
///
/// A failing member is reported through `tracing` and never stops the others;
/// `write` itself always succeeds.
#[derive(Default)]
pub struct MultiWriter {
    writers: Vec<Arc<dyn Writer>>,
}

impl MultiWriter {
    pub fn new(writers: Vec<Arc<dyn Writer>>) -> Self {
        Self { writers }
    }

    pub fn add_writer(&mut self, writer: Arc<dyn Writer>) {
        self.writers.push(writer);
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl Writer for MultiWriter {
    fn write(&self, entry: &LogEntry) -> Result<()> {
        for (index, writer) in self.writers.iter().enumerate() {
            if let Err(e) = writer.write(entry) {
                warn!(error = %e, writer = index, stream = %entry.stream(), "log writer failed");
            }
        }
        Ok(())
    }

    /// Closes every member; returns the last error seen, if any
    fn close(&self) -> Result<()> {
        let mut last_err = None;
        for writer in &self.writers {
            if let Err(e) = writer.close() {
                last_err = Some(e);
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        for writer in &self.writers {
            writer.set_formatter(formatter.clone());
        }
    }
}
