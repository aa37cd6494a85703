//! Orientation smoothing and level detection for a bubble level.
//!
//! Raw roll/pitch/yaw samples come from an [`source::OrientationSource`],
//! either the device sensor or a synthetic demo generator. They are smoothed
//! by an [`filter::OrientationFilter`] and published as
//! [`filter::SmoothedState`] snapshots that renderers pull when they redraw.
//! [`monitor::LevelMonitor`] ties the pieces together.

pub mod bubble;
pub mod config;
pub mod error;
pub mod filter;
pub mod math;
pub mod monitor;
pub mod smartvar;
pub mod source;

pub use config::{LevelConfig, RatePreset};
pub use error::LevelError;
pub use filter::{FilterConfig, FilterPhase, OrientationFilter, OrientationSample, SmoothedState, Timestamp};
pub use monitor::{LevelMonitor, SourceMode};

/// Something with a background activity that must be stopped.
///
/// `end` returns only after the activity has stopped.
pub trait Endable {
    fn end(&mut self);
}
