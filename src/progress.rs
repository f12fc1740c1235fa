//! Progress reporting for long-running batch operations.
//!
//! Modeled as an observer interface instead of a bare callback so multiple
//! consumers (job status, logging, tests) can subscribe without the batch
//! code knowing about them.

use std::sync::Mutex;
use tokio::sync::mpsc;

/// Observer notified after each completed group of work
pub trait ProgressObserver: Send + Sync {
    /// `processed` items finished out of `total`
    fn on_progress(&self, processed: usize, total: usize);
}

/// Observer that ignores all progress events
pub struct NullProgress;

impl ProgressObserver for NullProgress {
    fn on_progress(&self, _processed: usize, _total: usize) {}
}

/// Observer that forwards events into an unbounded channel, for tests and
/// UI bridges that consume progress asynchronously
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<(usize, usize)>,
}

impl ChannelProgress {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(usize, usize)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressObserver for ChannelProgress {
    fn on_progress(&self, processed: usize, total: usize) {
        // Receiver may have been dropped; progress is best-effort
        let _ = self.tx.send((processed, total));
    }
}

/// Fan-out observer notifying every subscriber in registration order
#[derive(Default)]
pub struct ProgressBus {
    observers: Mutex<Vec<Box<dyn ProgressObserver>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Box<dyn ProgressObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(observer);
    }
}

impl ProgressObserver for ProgressBus {
    fn on_progress(&self, processed: usize, total: usize) {
        let observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        for observer in observers.iter() {
            observer.on_progress(processed, total);
        }
    }
}
