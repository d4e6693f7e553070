use crate::error::SensorError;
use serde::Serialize;
use std::time::Duration;

pub mod iio;
pub mod mock;

/// Fastest sampling period the sample sources are asked to deliver at.
pub const MIN_SAMPLING_PERIOD: Duration = Duration::from_millis(100);

/// One 3-axis acceleration reading in m/s^2.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Sample {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn axes(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensorCapabilities {
    pub accelerometer: bool,
    pub gyroscope: bool,
}

/// Periodic source of acceleration samples.
///
/// `start` arms delivery at a period; calling it again while armed re-arms at
/// the new period. `stop` is idempotent.
pub trait SampleSource: Send {
    fn has_accelerometer(&self) -> bool;
    fn start(&mut self, period: Duration) -> Result<(), SensorError>;
    fn stop(&mut self);
    fn read_sample(&mut self) -> Result<Sample, SensorError>;

    fn capabilities(&self) -> SensorCapabilities {
        SensorCapabilities {
            accelerometer: self.has_accelerometer(),
            gyroscope: false,
        }
    }
}

/// Source used when the platform exposes no accelerometer at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAccelerometer;

impl SampleSource for NoAccelerometer {
    fn has_accelerometer(&self) -> bool {
        false
    }

    fn start(&mut self, _period: Duration) -> Result<(), SensorError> {
        Err(SensorError::Unavailable)
    }

    fn stop(&mut self) {}

    fn read_sample(&mut self) -> Result<Sample, SensorError> {
        Err(SensorError::Unavailable)
    }
}

/// Clamp a requested sampling period to the supported floor.
pub fn clamp_sampling_period(period: Duration) -> Duration {
    period.max(MIN_SAMPLING_PERIOD)
}
