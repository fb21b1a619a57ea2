use crate::error::{Result, StreamlogError};
use crate::logs::entry::LogEntry;
use crate::logs::format::Formatter;
use crate::logs::writer::{lock, Writer};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};

/// Lifecycle of an [`AsyncWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncState {
    /// Accepting entries
    Running,
    /// Shutdown signaled; the worker is flushing what was already queued
    Draining,
    /// Worker finished and the inner writer is closed
    Closed,
}

impl AsyncState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => AsyncState::Running,
            1 => AsyncState::Draining,
            _ => AsyncState::Closed,
        }
    }
}

/// Decorator that queues entries on a bounded buffer and writes them from one
/// background worker thread.
///
/// `write` never blocks: when the buffer is full the entry is dropped and
/// [`StreamlogError::BufferFull`] is returned.
pub struct AsyncWriter {
    inner: Arc<dyn Writer>,
    capacity: usize,
    sender: RwLock<Option<mpsc::Sender<LogEntry>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    state: AtomicU8,
    dropped: AtomicU64,
}

impl AsyncWriter {
    /// Wrap `inner` with a queue holding up to `buffer_size` pending entries
    pub fn new(inner: Arc<dyn Writer>, buffer_size: usize) -> Result<Self> {
        let capacity = buffer_size.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        let worker_inner = inner.clone();
        let handle = std::thread::Builder::new()
            .name("streamlog-async".to_string())
            .spawn(move || run_worker(worker_inner, rx))?;

        Ok(Self {
            inner,
            capacity,
            sender: RwLock::new(Some(tx)),
            worker: Mutex::new(Some(handle)),
            state: AtomicU8::new(AsyncState::Running as u8),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn state(&self) -> AsyncState {
        AsyncState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Number of entries rejected because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn run_worker(inner: Arc<dyn Writer>, mut rx: mpsc::Receiver<LogEntry>) {
    // Returns None once every sender is gone and the queue is empty,
    // so entries queued before shutdown are still written.
    while let Some(entry) = rx.blocking_recv() {
        if let Err(e) = inner.write(&entry) {
            warn!(error = %e, stream = %entry.stream(), "async log writer failed to write entry");
        }
    }
}

impl Writer for AsyncWriter {
    fn write(&self, entry: &LogEntry) -> Result<()> {
        if self.state() != AsyncState::Running {
            return Err(StreamlogError::WriterClosed);
        }

        let sender = self
            .sender
            .read()
            .map_err(|_| StreamlogError::LogWriteError("writer lock poisoned".to_string()))?;
        let Some(sender) = sender.as_ref() else {
            return Err(StreamlogError::WriterClosed);
        };

        match sender.try_send(entry.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(capacity = self.capacity, dropped, "async log buffer full, dropping entry");
                Err(StreamlogError::BufferFull(self.capacity))
            }
            Err(TrySendError::Closed(_)) => Err(StreamlogError::WriterClosed),
        }
    }

    /// Signal shutdown, wait for the worker to drain the queue, then close the
    /// inner writer
    fn close(&self) -> Result<()> {
        let Some(handle) = lock(&self.worker)?.take() else {
            return Ok(());
        };

        // No write can be mid-send once the sender is taken under the write lock
        match self.sender.write() {
            Ok(mut sender) => drop(sender.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }
        self.state
            .store(AsyncState::Draining as u8, Ordering::SeqCst);

        if handle.join().is_err() {
            error!("async log worker panicked");
        }

        let result = self.inner.close();
        self.state.store(AsyncState::Closed as u8, Ordering::SeqCst);
        result
    }

    fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        self.inner.set_formatter(formatter);
    }
}

impl Drop for AsyncWriter {
    fn drop(&mut self) {
        if self.state() == AsyncState::Running {
            let _ = self.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::entry::{LogLevel, StreamType};
    use crate::logs::writer::testing::MemoryWriter;
    use std::sync::mpsc as std_mpsc;
    use std::time::{Duration, Instant};

    fn entry(message: &str) -> LogEntry {
        let mut entry = LogEntry::new(StreamType::System, LogLevel::Info);
        entry.message = message.to_string();
        entry
    }

    /// Blocks inside `write` until released, reporting when it starts waiting
    struct GatedWriter {
        started: Mutex<std_mpsc::Sender<()>>,
        gate: Mutex<std_mpsc::Receiver<()>>,
        sink: Arc<MemoryWriter>,
    }

    impl Writer for GatedWriter {
        fn write(&self, entry: &LogEntry) -> Result<()> {
            let _ = self.started.lock().unwrap().send(());
            let _ = self.gate.lock().unwrap().recv();
            self.sink.write(entry)
        }

        fn close(&self) -> Result<()> {
            self.sink.close()
        }
    }

    #[test]
    fn test_entries_reach_inner_in_order() {
        let sink = MemoryWriter::new();
        let writer = AsyncWriter::new(sink.clone(), 16).unwrap();

        for i in 0..10 {
            writer.write(&entry(&format!("m{}", i))).unwrap();
        }
        writer.close().unwrap();

        let expected: Vec<String> = (0..10).map(|i| format!("m{}", i)).collect();
        assert_eq!(sink.messages(), expected);
        assert_eq!(sink.close_count(), 1);
        assert_eq!(writer.state(), AsyncState::Closed);
    }

    #[test]
    fn test_full_buffer_rejects_without_blocking() {
        let (started_tx, started_rx) = std_mpsc::channel();
        let (gate_tx, gate_rx) = std_mpsc::channel();
        let sink = MemoryWriter::new();
        let gated = Arc::new(GatedWriter {
            started: Mutex::new(started_tx),
            gate: Mutex::new(gate_rx),
            sink: sink.clone(),
        });
        let writer = AsyncWriter::new(gated, 2).unwrap();

        // Worker takes the first entry and stalls inside the inner writer
        writer.write(&entry("held")).unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Queue capacity is two
        writer.write(&entry("queued-1")).unwrap();
        writer.write(&entry("queued-2")).unwrap();

        let start = Instant::now();
        let result = writer.write(&entry("overflow"));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(matches!(result, Err(StreamlogError::BufferFull(2))));
        assert_eq!(writer.dropped(), 1);

        // Release the worker for every queued entry, then drain
        for _ in 0..3 {
            gate_tx.send(()).unwrap();
        }
        writer.close().unwrap();

        assert_eq!(sink.messages(), vec!["held", "queued-1", "queued-2"]);
    }

    #[test]
    fn test_close_drains_pending_entries() {
        let (started_tx, started_rx) = std_mpsc::channel();
        let (gate_tx, gate_rx) = std_mpsc::channel();
        let sink = MemoryWriter::new();
        let gated = Arc::new(GatedWriter {
            started: Mutex::new(started_tx),
            gate: Mutex::new(gate_rx),
            sink: sink.clone(),
        });
        let writer = Arc::new(AsyncWriter::new(gated, 8).unwrap());

        for i in 0..5 {
            writer.write(&entry(&format!("e{}", i))).unwrap();
        }
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let closer = {
            let writer = writer.clone();
            std::thread::spawn(move || writer.close())
        };

        // Wait for the shutdown signal before releasing the worker
        let deadline = Instant::now() + Duration::from_secs(5);
        while writer.state() == AsyncState::Running && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_ne!(writer.state(), AsyncState::Running);
        for _ in 0..3 {
            assert!(matches!(
                writer.write(&entry("after-close")),
                Err(StreamlogError::WriterClosed)
            ));
        }

        for _ in 0..5 {
            gate_tx.send(()).unwrap();
        }
        closer.join().unwrap().unwrap();

        assert_eq!(sink.len(), 5);
        assert!(!sink.messages().iter().any(|m| m == "after-close"));
        assert_eq!(writer.state(), AsyncState::Closed);
    }

    #[test]
    fn test_close_is_idempotent() {
        let sink = MemoryWriter::new();
        let writer = AsyncWriter::new(sink.clone(), 4).unwrap();

        writer.close().unwrap();
        writer.close().unwrap();
        assert_eq!(sink.close_count(), 1);
        assert!(matches!(
            writer.write(&entry("late")),
            Err(StreamlogError::WriterClosed)
        ));
    }

    #[test]
    fn test_inner_errors_are_absorbed() {
        let sink = MemoryWriter::failing();
        let writer = AsyncWriter::new(sink.clone(), 4).unwrap();

        assert!(writer.write(&entry("lost")).is_ok());
        assert!(writer.close().is_ok());
        assert_eq!(sink.len(), 0);
    }

    #[test]
    fn test_zero_buffer_is_clamped() {
        let writer = AsyncWriter::new(MemoryWriter::new(), 0).unwrap();
        assert_eq!(writer.capacity(), 1);
    }
}
