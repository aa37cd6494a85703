#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Per-axis exponential low pass filter.
///
/// The state starts at zero, so the first update is pulled toward the
/// origin instead of passing through.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha: f64,
    state: Vector3,
}

impl LowPassFilter {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: Vector3::default() }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.alpha = alpha;
    }

    pub fn update(&mut self, input: Vector3) -> Vector3 {
        let prev = self.state;
        let filtered = Vector3 {
            x: self.alpha * input.x + (1.0 - self.alpha) * prev.x,
            y: self.alpha * input.y + (1.0 - self.alpha) * prev.y,
            z: self.alpha * input.z + (1.0 - self.alpha) * prev.z,
        };

        self.state = filtered;
        filtered
    }

    pub fn reset(&mut self) {
        self.state = Vector3::default();
    }
}

pub fn deg_to_rad(deg: f64) -> f64 {
    deg * std::f64::consts::PI / 180.0
}
