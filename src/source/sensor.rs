use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_executor::LocalExecutor;

use crate::error::{LevelError, Result};
use crate::filter::OrientationSample;
use crate::smartvar::lock;
use crate::source::{OrientationSource, SampleSink};
use crate::Endable;

/// Samples buffered between the platform callback and the worker.
const FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Sample(OrientationSample),
    Error(String),
    End,
}

/// Handle given to the platform sensor callback.
#[derive(Clone)]
pub struct SensorFeed {
    tx: SyncSender<SensorEvent>,
    interval: Arc<Mutex<Duration>>,
    running: Arc<AtomicBool>,
}

impl SensorFeed {
    /// Hand one reading to the worker. Returns whether it was accepted.
    ///
    /// Readings are refused without a warning while the source is stopped;
    /// check [`Self::is_running`] to tell that apart from a full buffer.
    pub fn push(&self, sample: OrientationSample) -> bool {
        if !self.is_running() {
            return false;
        }

        match self.tx.try_send(SensorEvent::Sample(sample)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!("SensorFeed: buffer full, dropping sample");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    pub fn report_error(&self, message: impl Into<String>) {
        if !self.is_running() {
            return;
        }

        if let Err(e) = self.tx.try_send(SensorEvent::Error(message.into())) {
            log::warn!("SensorFeed: could not report error: {}", e);
        }
    }

    /// False while the source is stopped; the platform should pause its
    /// sensor updates then.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The period the platform should deliver readings at.
    pub fn requested_interval(&self) -> Duration {
        *lock(&self.interval)
    }
}

/// Live device orientation, pushed in through a [`SensorFeed`].
pub struct SensorSource {
    feed: Option<SensorFeed>,
    rx: Option<Receiver<SensorEvent>>,
    worker: Option<JoinHandle<Receiver<SensorEvent>>>,
}

impl SensorSource {
    /// A source backed by a device sensor, with the feed the platform
    /// callback pushes into.
    pub fn connected() -> (Self, SensorFeed) {
        let (tx, rx) = mpsc::sync_channel::<SensorEvent>(FEED_CAPACITY);
        let feed = SensorFeed { tx, interval: Arc::new(Mutex::new(Duration::ZERO)), running: Arc::new(AtomicBool::new(false)) };
        let me = Self { feed: Some(feed.clone()), rx: Some(rx), worker: None };
        (me, feed)
    }

    /// A device without orientation sensors.
    pub fn unavailable() -> Self {
        Self { feed: None, rx: None, worker: None }
    }
}

async fn sensor_thread(_executor: &LocalExecutor<'_>, sink: SampleSink, rx: &Receiver<SensorEvent>) -> Result<()> {
    loop {
        match rx.recv() {
            Ok(SensorEvent::Sample(sample)) => {
                sink.deliver(sample);
            }
            Ok(SensorEvent::Error(message)) => {
                sink.report_error(message);
            }
            Ok(SensorEvent::End) => break,
            Err(_) => {
                return Err(LevelError::SourceUnavailable("sensor feed disconnected".into()));
            }
        }
    }
    Ok(())
}

impl OrientationSource for SensorSource {
    fn name(&self) -> &'static str {
        "sensor"
    }

    fn is_available(&self) -> bool {
        self.feed.is_some()
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn start(&mut self, period: Duration, sink: SampleSink) -> Result<()> {
        if self.worker.is_some() {
            return Err(LevelError::AlreadyRunning(self.name()));
        }

        let Some(feed) = self.feed.as_ref() else {
            return Err(LevelError::SourceUnavailable("no orientation sensor on this device".into()));
        };
        let Some(rx) = self.rx.take() else {
            return Err(LevelError::SourceUnavailable("sensor feed lost".into()));
        };

        *lock(&feed.interval) = period;

        // readings queued while stopped belong to the previous run
        while rx.try_recv().is_ok() {}
        feed.running.store(true, Ordering::Release);

        let handle = thread::Builder::new().name("sensor-source".into()).stack_size(1024 * 20).spawn(move || {
            let executor = LocalExecutor::new();

            {
                let fut = &mut pin!(sensor_thread(&executor, sink, &rx));

                if let Err(e) = async_io::block_on(executor.run(fut)) {
                    log::error!("Error sensor source thread: {}", e);
                }
            }

            log::info!("SensorSource: thread ended");
            rx
        });

        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                feed.running.store(false, Ordering::Release);
                return Err(e.into());
            }
        };

        log::info!("SensorSource: started, period {:?}", period);
        self.worker = Some(handle);
        Ok(())
    }
}

impl Endable for SensorSource {
    fn end(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        log::debug!("SensorSource: end");
        if let Some(feed) = self.feed.as_ref() {
            feed.running.store(false, Ordering::Release);
            // blocking send: the worker drains the buffer until it sees End
            if let Err(e) = feed.tx.send(SensorEvent::End) {
                log::error!("Error sending end signal: {}", e);
            }
        }

        match handle.join() {
            Ok(rx) => self.rx = Some(rx),
            Err(_) => log::error!("SensorSource: thread panicked"),
        }
    }
}

impl Drop for SensorSource {
    fn drop(&mut self) {
        log::debug!("SensorSource: drop");
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::test_sink;

    #[test]
    fn unavailable_source_refuses_to_start() {
        let (sink, _, _) = test_sink();
        let mut source = SensorSource::unavailable();
        assert!(!source.is_available());
        assert!(matches!(source.start(Duration::from_millis(10), sink), Err(LevelError::SourceUnavailable(_))));
        assert!(!source.is_running());
    }

    #[test]
    fn pushed_samples_reach_the_sink() {
        let (sink, state, _) = test_sink();
        let (mut source, feed) = SensorSource::connected();
        let rx_changed = state.subscribe();
        source.start(Duration::from_millis(10), sink).unwrap();
        assert_eq!(feed.requested_interval(), Duration::from_millis(10));

        assert!(feed.push(OrientationSample::new(1.5, -2.5, 90.0)));
        rx_changed.recv_timeout(Duration::from_secs(2)).unwrap();

        source.end();
        let s = state.get();
        assert_eq!((s.roll(), s.pitch(), s.yaw()), (1.5, -2.5, 90.0));
        assert!(s.is_level());
    }

    #[test]
    fn errors_become_diagnostics() {
        let (sink, _, diagnostic) = test_sink();
        let (mut source, feed) = SensorSource::connected();
        let rx_changed = diagnostic.subscribe();
        source.start(Duration::from_millis(10), sink).unwrap();

        feed.report_error("attitude reference lost");
        rx_changed.recv_timeout(Duration::from_secs(2)).unwrap();
        source.end();

        assert_eq!(diagnostic.get().as_deref(), Some("attitude reference lost"));
    }

    #[test]
    fn restarts_after_end_and_ignores_stale_readings() {
        let (sink, state, _) = test_sink();
        let (mut source, feed) = SensorSource::connected();

        source.start(Duration::from_millis(5), sink.clone()).unwrap();
        source.end();

        // pushed while stopped
        feed.push(OrientationSample::new(50.0, 50.0, 50.0));

        let rx_changed = state.subscribe();
        source.start(Duration::from_millis(5), sink).unwrap();
        feed.push(OrientationSample::new(1.0, 1.0, 1.0));
        rx_changed.recv_timeout(Duration::from_secs(2)).unwrap();
        source.end();

        assert_eq!(state.get().roll(), 1.0);
    }

    #[test]
    fn nothing_is_delivered_after_end() {
        let (sink, state, _) = test_sink();
        let (mut source, feed) = SensorSource::connected();
        source.start(Duration::from_millis(5), sink).unwrap();
        source.end();

        feed.push(OrientationSample::new(9.0, 9.0, 9.0));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(state.get().roll(), 0.0);
    }

    #[test]
    fn feed_refuses_quietly_while_stopped() {
        let (sink, state, _) = test_sink();
        let (mut source, feed) = SensorSource::connected();
        assert!(!feed.is_running());
        assert!(!feed.push(OrientationSample::new(5.0, 5.0, 5.0)));

        source.start(Duration::from_millis(5), sink.clone()).unwrap();
        assert!(feed.is_running());
        source.end();
        assert!(!feed.is_running());

        let accepted = (0..200).filter(|_| feed.push(OrientationSample::new(9.0, 9.0, 9.0))).count();
        assert_eq!(accepted, 0);

        let rx_changed = state.subscribe();
        source.start(Duration::from_millis(5), sink).unwrap();
        assert!(feed.push(OrientationSample::new(2.0, 2.0, 2.0)));
        rx_changed.recv_timeout(Duration::from_secs(2)).unwrap();
        source.end();

        assert_eq!(state.get().roll(), 2.0);
    }
}
