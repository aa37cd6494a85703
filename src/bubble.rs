//! Screen geometry for the bubble and cube views.

use crate::filter::SmoothedState;
use crate::math::{deg_to_rad, Vector3};

/// Tilt that moves the bubble to the rim.
pub const MAX_BUBBLE_ANGLE_DEG: f64 = 45.0;

/// Keeps the bubble inside the outer ring.
pub const BUBBLE_MARGIN: f64 = 20.0;

/// Bubble offset from the dial center for a dial of `radius` points.
///
/// Roll drives x and pitch drives y. The distance is clamped so the bubble
/// stays `BUBBLE_MARGIN` inside the rim, keeping its direction.
pub fn bubble_offset(state: &SmoothedState, radius: f64) -> (f64, f64) {
    let x = state.roll() / MAX_BUBBLE_ANGLE_DEG * radius;
    let y = state.pitch() / MAX_BUBBLE_ANGLE_DEG * radius;

    let distance = x.hypot(y);
    let angle = y.atan2(x);
    let clamped = distance.min((radius - BUBBLE_MARGIN).max(0.0));

    (angle.cos() * clamped, angle.sin() * clamped)
}

/// Euler angles in radians for the cube: x from pitch, y from yaw, z from roll.
pub fn cube_rotation(state: &SmoothedState) -> Vector3 {
    Vector3::new(deg_to_rad(state.pitch()), deg_to_rad(state.yaw()), deg_to_rad(state.roll()))
}
