use crate::sensor::Sample;

pub const DEFAULT_ALPHA: f32 = 0.8;

/// Single-pole low-pass estimate of the gravity vector.
#[derive(Debug, Clone, PartialEq)]
pub struct GravityFilter {
    alpha: f32,
    gravity: [f32; 3],
}

impl GravityFilter {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            gravity: [0.0; 3],
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn gravity(&self) -> [f32; 3] {
        self.gravity
    }

    pub fn reset(&mut self) {
        self.gravity = [0.0; 3];
    }

    /// Folds `sample` into the gravity estimate and returns the magnitude of
    /// the remaining linear acceleration.
    pub fn update(&mut self, sample: Sample) -> f32 {
        let mut sum_sq = 0.0_f32;
        for (gravity, value) in self.gravity.iter_mut().zip(sample.axes()) {
            *gravity = self.alpha * *gravity + (1.0 - self.alpha) * value;
            let linear = value - *gravity;
            sum_sq += linear * linear;
        }
        sum_sq.sqrt()
    }
}

impl Default for GravityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}
