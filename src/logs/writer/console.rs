use crate::error::Result;
use crate::logs::entry::LogEntry;
use crate::logs::format::{Formatter, TextFormatter};
use crate::logs::writer::{lock, FormatterSlot, Writer};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Writes rendered lines to standard output (or any byte sink)
pub struct ConsoleWriter {
    output: Mutex<Box<dyn Write + Send>>,
    formatter: FormatterSlot,
}

impl ConsoleWriter {
    /// Console writer on stdout with the default text formatter
    pub fn new() -> Self {
        Self::with_formatter(Arc::new(TextFormatter::new()))
    }

    pub fn with_formatter(formatter: Arc<dyn Formatter>) -> Self {
        Self::with_output(Box::new(io::stdout()), formatter)
    }

    pub fn with_output(output: Box<dyn Write + Send>, formatter: Arc<dyn Formatter>) -> Self {
        Self {
            output: Mutex::new(output),
            formatter: FormatterSlot::new(formatter),
        }
    }
}

impl Default for ConsoleWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for ConsoleWriter {
    fn write(&self, entry: &LogEntry) -> Result<()> {
        let line = self.formatter.get().format_for_terminal(entry);

        let mut output = lock(&self.output)?;
        writeln!(output, "{}", line)?;
        output.flush()?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.formatter.set(formatter);
    }
}
