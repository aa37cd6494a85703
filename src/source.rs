pub mod demo;
pub mod sensor;

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::filter::{OrientationFilter, OrientationSample, SmoothedState, Timestamp};
use crate::smartvar::{lock, SmartVar};
use crate::Endable;

/// A producer of orientation samples at a nominal rate.
///
/// Only one source may feed a filter at a time. `end` must stop the
/// producer and wait for it, so nothing reaches the sink once it returns.
pub trait OrientationSource: Endable + Send {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    fn is_running(&self) -> bool;

    fn start(&mut self, period: Duration, sink: SampleSink) -> Result<()>;
}

/// Where sources deliver samples: timestamps them, runs them through the
/// shared filter and publishes the result.
#[derive(Clone)]
pub struct SampleSink {
    filter: Arc<Mutex<OrientationFilter>>,
    state: Arc<SmartVar<SmoothedState>>,
    diagnostic: Arc<SmartVar<Option<String>>>,
    origin: Instant,
}

impl SampleSink {
    pub fn new(
        filter: Arc<Mutex<OrientationFilter>>,
        state: Arc<SmartVar<SmoothedState>>,
        diagnostic: Arc<SmartVar<Option<String>>>,
        origin: Instant,
    ) -> Self {
        Self { filter, state, diagnostic, origin }
    }

    pub fn now(&self) -> Timestamp {
        self.origin.elapsed().as_secs_f64()
    }

    pub fn deliver(&self, sample: OrientationSample) -> SmoothedState {
        self.deliver_at(sample, self.now())
    }

    pub fn deliver_at(&self, sample: OrientationSample, arrival: Timestamp) -> SmoothedState {
        // hold the filter lock across publish so snapshots land in ingest order
        let mut filter = lock(&self.filter);
        let state = filter.ingest(sample, arrival);
        self.state.set(state);
        state
    }

    /// Surface a user-visible message, e.g. a sensor error.
    pub fn report_error(&self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("SampleSink: {}", message);
        self.diagnostic.set(Some(message));
    }
}

/// Wait up to `timeout` for an end signal. True once one arrived or the
/// sender is gone, so a worker sleeping here stops as soon as it is told.
pub(crate) fn end_within(rx_end: &Receiver<bool>, timeout: Duration) -> bool {
    match rx_end.recv_timeout(timeout) {
        Ok(end) => end,
        Err(RecvTimeoutError::Timeout) => false,
        Err(RecvTimeoutError::Disconnected) => true,
    }
}

#[cfg(test)]
pub(crate) fn test_sink() -> (SampleSink, Arc<SmartVar<SmoothedState>>, Arc<SmartVar<Option<String>>>) {
    use crate::filter::FilterConfig;

    let filter = Arc::new(Mutex::new(OrientationFilter::new(FilterConfig::new(1.0, 0.01).unwrap())));
    let state = SmartVar::new(SmoothedState::default());
    let diagnostic = SmartVar::new(None);
    let sink = SampleSink::new(filter, state.clone(), diagnostic.clone(), Instant::now());
    (sink, state, diagnostic)
}
