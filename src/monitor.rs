//! The level application controller.
//!
//! [`LevelMonitor`] owns the filter, the published state and both sample
//! sources. It makes sure only one source feeds the filter at a time, and
//! that every source switch or configuration change starts from a cold
//! filter.

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::config::RatePreset;
use crate::error::{LevelError, Result};
use crate::filter::{FilterConfig, OrientationFilter, SmoothedState};
use crate::smartvar::{lock, SmartVar};
use crate::source::demo::DemoSource;
use crate::source::{OrientationSource, SampleSink};

pub const NO_SENSORS_MESSAGE: &str = "No Sensors Available. Displaying Demo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Sensor,
    Demo,
}

pub struct LevelMonitor {
    filter: Arc<Mutex<OrientationFilter>>,
    state: Arc<SmartVar<SmoothedState>>,
    diagnostic: Arc<SmartVar<Option<String>>>,
    sensor: Box<dyn OrientationSource>,
    demo: Box<dyn OrientationSource>,
    mode: SourceMode,
    running: Option<SourceMode>,
    origin: Instant,
}

impl LevelMonitor {
    pub fn new(config: FilterConfig, sensor: Box<dyn OrientationSource>) -> Self {
        Self::with_sources(config, sensor, Box::new(DemoSource::new()))
    }

    pub fn with_sources(config: FilterConfig, sensor: Box<dyn OrientationSource>, demo: Box<dyn OrientationSource>) -> Self {
        Self {
            filter: Arc::new(Mutex::new(OrientationFilter::new(config))),
            state: SmartVar::new(SmoothedState::default()),
            diagnostic: SmartVar::new(None),
            sensor,
            demo,
            mode: SourceMode::Sensor,
            running: None,
            origin: Instant::now(),
        }
    }

    /// (Re)start sampling in the current mode, falling back to the demo
    /// source when the sensor is unavailable.
    pub fn start_updates(&mut self) -> Result<()> {
        self.stop_updates();
        self.diagnostic.set(None);

        {
            let mut filter = lock(&self.filter);
            filter.reset();
            self.state.set(filter.state());
        }

        let period = lock(&self.filter).config().period();
        let sink = self.sink();

        if self.mode == SourceMode::Sensor {
            match self.sensor.start(period, sink.clone()) {
                Ok(()) => {
                    log::info!("LevelMonitor: running {} source", self.sensor.name());
                    self.running = Some(SourceMode::Sensor);
                    return Ok(());
                }
                Err(LevelError::SourceUnavailable(reason)) => {
                    log::warn!("LevelMonitor: {}, switching to demo", reason);
                    self.diagnostic.set(Some(NO_SENSORS_MESSAGE.to_string()));
                    self.mode = SourceMode::Demo;
                }
                Err(e) => return Err(e),
            }
        }

        self.demo.start(period, sink)?;
        log::info!("LevelMonitor: running {} source", self.demo.name());
        self.running = Some(SourceMode::Demo);
        Ok(())
    }

    /// Stop the active source. Returns once it has stopped delivering.
    pub fn stop_updates(&mut self) {
        if let Some(mode) = self.running.take() {
            log::debug!("LevelMonitor: stopping {:?} source", mode);
            match mode {
                SourceMode::Sensor => self.sensor.end(),
                SourceMode::Demo => self.demo.end(),
            }
        }
    }

    pub fn set_mode(&mut self, mode: SourceMode) -> Result<()> {
        self.mode = mode;
        self.restart_if_running()
    }

    pub fn toggle_mode(&mut self) -> Result<()> {
        let mode = match self.mode {
            SourceMode::Sensor => SourceMode::Demo,
            SourceMode::Demo => SourceMode::Sensor,
        };
        self.set_mode(mode)
    }

    /// Validate and apply new coefficients, then restart a running source
    /// from a cold filter. A rejected config leaves everything as it was.
    pub fn configure(&mut self, alpha: f64, update_interval_secs: f64) -> Result<()> {
        lock(&self.filter).configure(alpha, update_interval_secs)?;
        self.restart_if_running()
    }

    pub fn set_smoothing_alpha(&mut self, alpha: f64) -> Result<()> {
        let interval = self.config().update_interval_secs();
        self.configure(alpha, interval)
    }

    pub fn set_update_interval(&mut self, update_interval_secs: f64) -> Result<()> {
        let alpha = self.config().alpha();
        self.configure(alpha, update_interval_secs)
    }

    pub fn set_rate(&mut self, preset: RatePreset) -> Result<()> {
        self.set_update_interval(preset.interval_secs())
    }

    pub fn config(&self) -> FilterConfig {
        lock(&self.filter).config()
    }

    pub fn snapshot(&self) -> SmoothedState {
        self.state.get()
    }

    /// Signals after each published state; pull with [`Self::snapshot`].
    pub fn subscribe(&self) -> Receiver<()> {
        self.state.subscribe()
    }

    pub fn diagnostic(&self) -> Option<String> {
        self.diagnostic.get()
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn sink(&self) -> SampleSink {
        SampleSink::new(self.filter.clone(), self.state.clone(), self.diagnostic.clone(), self.origin)
    }

    fn restart_if_running(&mut self) -> Result<()> {
        if self.running.is_some() {
            self.start_updates()
        } else {
            Ok(())
        }
    }
}

impl Drop for LevelMonitor {
    fn drop(&mut self) {
        log::debug!("LevelMonitor: drop");
        self.stop_updates();
    }
}
