use std::pin::pin;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use async_executor::LocalExecutor;

use crate::error::{LevelError, Result};
use crate::filter::OrientationSample;
use crate::source::{end_within, OrientationSource, SampleSink};
use crate::Endable;

const TICK_STEP: f64 = 0.1;
const SWING_DEG: f64 = 10.0;
const PITCH_RATE: f64 = 0.7;
const YAW_STEP_DEG: f64 = 0.5;

/// Deterministic synthetic orientation: sinusoidal roll and pitch and a
/// slowly turning yaw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemoGenerator {
    tick: f64,
    yaw: f64,
}

impl DemoGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a given tick and yaw.
    pub fn starting_at(tick: f64, yaw: f64) -> Self {
        Self { tick, yaw }
    }

    pub fn tick(&self) -> f64 {
        self.tick
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn next_sample(&mut self) -> OrientationSample {
        self.tick += TICK_STEP;
        self.yaw = (self.yaw + YAW_STEP_DEG) % 360.0;

        OrientationSample {
            roll: SWING_DEG * self.tick.sin(),
            pitch: SWING_DEG * (self.tick * PITCH_RATE).cos(),
            yaw: self.yaw,
        }
    }
}

impl Iterator for DemoGenerator {
    type Item = OrientationSample;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_sample())
    }
}

/// Runs a [`DemoGenerator`] on its own thread, one sample per period.
pub struct DemoSource {
    worker: Option<(Sender<bool>, JoinHandle<()>)>,
}

impl DemoSource {
    pub fn new() -> Self {
        Self { worker: None }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

async fn demo_thread(_executor: &LocalExecutor<'_>, period: Duration, sink: SampleSink, rx_end: Receiver<bool>) -> Result<()> {
    let mut generator = DemoGenerator::new();
    loop {
        sink.deliver(generator.next_sample());
        if end_within(&rx_end, period) {
            break;
        }
    }
    Ok(())
}

impl OrientationSource for DemoSource {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn start(&mut self, period: Duration, sink: SampleSink) -> Result<()> {
        if self.worker.is_some() {
            return Err(LevelError::AlreadyRunning(self.name()));
        }

        let (tx_end, rx_end) = mpsc::channel::<bool>();

        let handle = thread::Builder::new().name("demo-source".into()).stack_size(1024 * 20).spawn(move || {
            let executor = LocalExecutor::new();

            let fut = &mut pin!(demo_thread(&executor, period, sink, rx_end));

            if let Err(e) = async_io::block_on(executor.run(fut)) {
                log::error!("Error demo source thread: {}", e);
            }

            log::info!("DemoSource: thread ended");
        })?;

        log::info!("DemoSource: started, period {:?}", period);
        self.worker = Some((tx_end, handle));
        Ok(())
    }
}

impl Endable for DemoSource {
    fn end(&mut self) {
        let Some((tx_end, handle)) = self.worker.take() else {
            return;
        };

        log::debug!("DemoSource: end");
        if let Err(e) = tx_end.send(true) {
            log::error!("Error sending end signal: {}", e);
        }
        if handle.join().is_err() {
            log::error!("DemoSource: thread panicked");
        }
    }
}

impl Drop for DemoSource {
    fn drop(&mut self) {
        log::debug!("DemoSource: drop");
        self.end();
    }
}
