use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single-writer, multi-reader value that is always read whole.
///
/// Writers hand over a complete value under one lock. Readers pull a copy
/// with [`SmartVar::get`] whenever they want to redraw, and may subscribe to
/// a change signal that never blocks the writer.
pub struct SmartVar<T: Clone + Send> {
    value: Mutex<T>,
    subscribers: Mutex<Vec<SyncSender<()>>>,
}

impl<T: Clone + Send + 'static> SmartVar<T> {
    pub fn new(value: T) -> Arc<Self> {
        Arc::new(Self { value: Mutex::new(value), subscribers: Mutex::new(Vec::new()) })
    }

    pub fn set(&self, value: T) {
        *lock(&self.value) = value;
        self.notify();
    }

    pub fn get(&self) -> T {
        lock(&self.value).clone()
    }

    /// Returns a receiver that gets a signal after each `set`.
    ///
    /// Signals coalesce: a slow reader sees at most one pending signal and
    /// should pull the latest value with `get`.
    pub fn subscribe(&self) -> Receiver<()> {
        let (tx, rx) = mpsc::sync_channel::<()>(1);
        lock(&self.subscribers).push(tx);
        rx
    }

    fn notify(&self) {
        lock(&self.subscribers).retain(|tx| match tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => true,
            Err(TrySendError::Disconnected(())) => {
                log::debug!("SmartVar: dropping disconnected subscriber");
                false
            }
        });
    }
}
