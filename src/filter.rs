//! Orientation smoothing and level classification.

use std::time::Duration;

use crate::error::{LevelError, Result};
use crate::math::{LowPassFilter, Vector3};

/// Roll and pitch magnitudes must both stay strictly below this to be level.
pub const LEVEL_THRESHOLD_DEG: f64 = 3.0;

pub const DEFAULT_ALPHA: f64 = 0.15;
pub const DEFAULT_UPDATE_INTERVAL_SECS: f64 = 1.0 / 60.0;

/// Seconds on a monotonic clock.
pub type Timestamp = f64;

/// One raw reading, in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationSample {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl OrientationSample {
    pub fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// Smoothed orientation as seen by renderers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothedState {
    roll: f64,
    pitch: f64,
    yaw: f64,
    is_level: bool,
    sample_hz: f64,
}

impl SmoothedState {
    fn from_filtered(filtered: Vector3, sample_hz: f64) -> Self {
        Self {
            roll: filtered.x,
            pitch: filtered.y,
            yaw: filtered.z,
            is_level: is_level(filtered.x, filtered.y),
            sample_hz,
        }
    }

    pub fn roll(&self) -> f64 {
        self.roll
    }

    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    pub fn yaw(&self) -> f64 {
        self.yaw
    }

    pub fn is_level(&self) -> bool {
        self.is_level
    }

    /// Rate estimate from the last two arrivals, `0.0` until two have arrived.
    pub fn sample_hz(&self) -> f64 {
        self.sample_hz
    }
}

/// Yaw does not take part in leveling.
pub fn is_level(roll: f64, pitch: f64) -> bool {
    roll.abs() < LEVEL_THRESHOLD_DEG && pitch.abs() < LEVEL_THRESHOLD_DEG
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterConfig {
    alpha: f64,
    update_interval_secs: f64,
}

impl FilterConfig {
    pub fn new(alpha: f64, update_interval_secs: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(LevelError::InvalidConfig(format!("alpha must be in (0, 1], got {}", alpha)));
        }

        if !(update_interval_secs > 0.0) || Duration::try_from_secs_f64(update_interval_secs).is_err() {
            return Err(LevelError::InvalidConfig(format!(
                "update interval must be a positive number of seconds, got {}",
                update_interval_secs
            )));
        }

        Ok(Self { alpha, update_interval_secs })
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn update_interval_secs(&self) -> f64 {
        self.update_interval_secs
    }

    /// Nominal sampling period for the source.
    pub fn period(&self) -> Duration {
        // validated in new()
        Duration::from_secs_f64(self.update_interval_secs)
    }

    pub fn nominal_hz(&self) -> f64 {
        1.0 / self.update_interval_secs
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { alpha: DEFAULT_ALPHA, update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPhase {
    /// Nothing ingested since construction or the last reset.
    Cold,
    Warm,
}

/// Exponential smoothing of roll, pitch and yaw with level detection and
/// sample rate tracking.
///
/// The filter is not reentrant. Callers confine it to a single producer or
/// put it behind a mutex.
#[derive(Debug, Clone)]
pub struct OrientationFilter {
    config: FilterConfig,
    lowpass: LowPassFilter,
    state: SmoothedState,
    previous_arrival: Option<Timestamp>,
}

impl OrientationFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            lowpass: LowPassFilter::new(config.alpha()),
            state: SmoothedState::default(),
            previous_arrival: None,
        }
    }

    /// Replace the coefficients. On error the active config is untouched.
    /// Past samples are not re-filtered.
    pub fn configure(&mut self, alpha: f64, update_interval_secs: f64) -> Result<()> {
        let config = FilterConfig::new(alpha, update_interval_secs)?;
        self.set_config(config);
        Ok(())
    }

    pub fn set_config(&mut self, config: FilterConfig) {
        log::debug!(
            "OrientationFilter: alpha={} interval={}s",
            config.alpha(),
            config.update_interval_secs()
        );
        self.config = config;
        self.lowpass.set_alpha(config.alpha());
    }

    pub fn config(&self) -> FilterConfig {
        self.config
    }

    pub fn ingest(&mut self, sample: OrientationSample, arrival: Timestamp) -> SmoothedState {
        let filtered = self.lowpass.update(Vector3::new(sample.roll, sample.pitch, sample.yaw));

        let sample_hz = match self.previous_arrival {
            None => 0.0,
            Some(previous) => {
                let delta = arrival - previous;
                if delta > 0.0 {
                    1.0 / delta
                } else {
                    log::trace!("OrientationFilter: non-increasing arrival {} after {}", arrival, previous);
                    self.state.sample_hz
                }
            }
        };

        self.previous_arrival = Some(arrival);
        self.state = SmoothedState::from_filtered(filtered, sample_hz);
        self.state
    }

    pub fn reset(&mut self) {
        self.lowpass.reset();
        self.state = SmoothedState::default();
        self.previous_arrival = None;
    }

    pub fn state(&self) -> SmoothedState {
        self.state
    }

    pub fn phase(&self) -> FilterPhase {
        match self.previous_arrival {
            None => FilterPhase::Cold,
            Some(_) => FilterPhase::Warm,
        }
    }
}

impl Default for OrientationFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const EPS: f64 = 1e-9;

    fn filter(alpha: f64) -> OrientationFilter {
        OrientationFilter::new(FilterConfig::new(alpha, 0.1).unwrap())
    }

    #[test]
    fn starts_cold_with_zero_state() {
        let f = OrientationFilter::default();
        assert_eq!(f.phase(), FilterPhase::Cold);
        assert_eq!(f.state(), SmoothedState::default());
        assert!(!f.state().is_level());
        assert_eq!(f.state().sample_hz(), 0.0);
    }

    #[test]
    fn cold_ingest_scales_by_alpha() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let alpha: f64 = rng.gen_range(0.001..=1.0);
            let v: f64 = rng.gen_range(-180.0..180.0);
            let mut f = filter(alpha);
            let s = f.ingest(OrientationSample::new(v, v, v), 0.0);
            assert!((s.roll() - alpha * v).abs() < EPS);
            assert!((s.pitch() - alpha * v).abs() < EPS);
            assert!((s.yaw() - alpha * v).abs() < EPS);
        }
    }

    #[test]
    fn repeated_input_converges_monotonically() {
        let mut f = filter(0.15);
        let target = 42.0;
        let mut last_gap = f64::INFINITY;
        for i in 0..100 {
            let s = f.ingest(OrientationSample::new(target, -target, 0.0), i as f64 * 0.01);
            let gap = (target - s.roll()).abs();
            assert!(gap < last_gap);
            assert!(s.roll() <= target);
            last_gap = gap;
        }
        assert!(last_gap < 1e-4);
    }

    #[test]
    fn alpha_one_passes_through() {
        let mut f = filter(1.0);
        let s = f.ingest(OrientationSample::new(12.5, -7.0, 270.0), 0.0);
        assert_eq!(s.roll(), 12.5);
        assert_eq!(s.pitch(), -7.0);
        assert_eq!(s.yaw(), 270.0);

        let s = f.ingest(OrientationSample::new(1.0, 2.0, 3.0), 0.1);
        assert_eq!((s.roll(), s.pitch(), s.yaw()), (1.0, 2.0, 3.0));
    }

    #[test]
    fn level_threshold_is_strict() {
        let mut f = filter(1.0);
        assert!(f.ingest(OrientationSample::new(2.999, 0.0, 0.0), 0.0).is_level());
        assert!(!f.ingest(OrientationSample::new(3.0, 0.0, 0.0), 0.1).is_level());
        assert!(!f.ingest(OrientationSample::new(0.0, -3.0, 0.0), 0.2).is_level());
        assert!(f.ingest(OrientationSample::new(-2.0, 2.0, 0.0), 0.3).is_level());
    }

    #[test]
    fn yaw_is_ignored_for_level() {
        let mut f = filter(1.0);
        assert!(f.ingest(OrientationSample::new(0.0, 0.0, 179.0), 0.0).is_level());
    }

    #[test]
    fn level_uses_smoothed_values() {
        // raw roll of 10 is not level, but the cold-start smoothed value is 1.5
        let mut f = filter(0.15);
        let s = f.ingest(OrientationSample::new(10.0, 0.0, 0.0), 0.0);
        assert!(s.is_level());
    }

    #[test]
    fn rate_from_two_arrivals() {
        let mut f = filter(0.5);
        let first = f.ingest(OrientationSample::default(), 0.0);
        assert_eq!(first.sample_hz(), 0.0);
        let second = f.ingest(OrientationSample::default(), 0.1);
        assert!((second.sample_hz() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn non_increasing_arrival_keeps_previous_rate() {
        let mut f = filter(0.5);
        f.ingest(OrientationSample::default(), 1.0);
        f.ingest(OrientationSample::default(), 1.5);
        let same = f.ingest(OrientationSample::default(), 1.5);
        assert!((same.sample_hz() - 2.0).abs() < 1e-9);
        let back = f.ingest(OrientationSample::default(), 1.0);
        assert!(back.sample_hz().is_finite());
    }

    #[test]
    fn reset_is_idempotent_and_returns_to_cold() {
        let mut f = filter(0.5);
        f.ingest(OrientationSample::new(20.0, 20.0, 20.0), 0.0);
        f.ingest(OrientationSample::new(20.0, 20.0, 20.0), 0.1);
        assert_eq!(f.phase(), FilterPhase::Warm);

        f.reset();
        let once = f.clone();
        f.reset();
        assert_eq!(f.phase(), FilterPhase::Cold);
        assert_eq!(f.state(), once.state());

        let s = f.ingest(OrientationSample::new(4.0, 0.0, 0.0), 5.0);
        assert_eq!(s.roll(), 2.0);
        assert_eq!(s.sample_hz(), 0.0);
    }

    #[test]
    fn rejects_bad_config_and_keeps_previous() {
        let mut f = filter(0.3);
        assert!(matches!(f.configure(0.0, 1.0), Err(LevelError::InvalidConfig(_))));
        assert!(matches!(f.configure(1.1, 1.0), Err(LevelError::InvalidConfig(_))));
        assert!(matches!(f.configure(f64::NAN, 1.0), Err(LevelError::InvalidConfig(_))));
        assert!(matches!(f.configure(0.5, 0.0), Err(LevelError::InvalidConfig(_))));
        assert!(matches!(f.configure(0.5, -1.0), Err(LevelError::InvalidConfig(_))));
        assert!(matches!(f.configure(0.5, f64::INFINITY), Err(LevelError::InvalidConfig(_))));
        assert_eq!(f.config().alpha(), 0.3);
        assert_eq!(f.config().update_interval_secs(), 0.1);
    }

    #[test]
    fn configure_applies_to_next_ingest_only() {
        let mut f = filter(0.5);
        let first = f.ingest(OrientationSample::new(10.0, 0.0, 0.0), 0.0);
        assert_eq!(first.roll(), 5.0);

        f.configure(1.0, 0.05).unwrap();
        assert_eq!(f.state().roll(), 5.0);
        let next = f.ingest(OrientationSample::new(8.0, 0.0, 0.0), 0.05);
        assert_eq!(next.roll(), 8.0);
    }

    #[test]
    fn nan_passes_through() {
        let mut f = filter(0.5);
        let s = f.ingest(OrientationSample::new(f64::NAN, 0.0, 0.0), 0.0);
        assert!(s.roll().is_nan());
        assert!(!s.is_level());
    }

    #[test]
    fn default_config_matches_sixty_hz() {
        let config = FilterConfig::default();
        assert_eq!(config.alpha(), 0.15);
        assert!((config.nominal_hz() - 60.0).abs() < 1e-9);
    }
}
