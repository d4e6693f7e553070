//! Linux Industrial I/O accelerometer source.
//!
//! Reads `in_accel_{x,y,z}_raw` from a sysfs IIO device directory and scales
//! them by `in_accel_scale` into m/s^2.

use crate::error::SensorError;
use crate::sensor::{Sample, SampleSource};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_IIO_ROOT: &str = "/sys/bus/iio/devices";

const X_CHANNEL: &str = "in_accel_x_raw";
const Y_CHANNEL: &str = "in_accel_y_raw";
const Z_CHANNEL: &str = "in_accel_z_raw";
const SCALE_FILE: &str = "in_accel_scale";
const FREQUENCY_FILE: &str = "sampling_frequency";

#[derive(Debug, Clone)]
pub struct IioAccelerometer {
    device_dir: PathBuf,
    scale: f32,
    period: Option<Duration>,
}

impl IioAccelerometer {
    pub fn new(device_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: device_dir.into(),
            scale: 1.0,
            period: None,
        }
    }

    /// Find the first device under `root` that exposes accelerometer channels.
    pub fn discover(root: impl AsRef<Path>) -> Option<Self> {
        let entries = std::fs::read_dir(root.as_ref()).ok()?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.join(X_CHANNEL).is_file())
            .collect();
        candidates.sort();
        candidates.into_iter().next().map(Self::new)
    }

    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }

    fn read_value(&self, file: &str) -> Result<f32, SensorError> {
        let path = self.device_dir.join(file);
        let contents = std::fs::read_to_string(&path)
            .map_err(|err| SensorError::Read(format!("{}: {err}", path.display())))?;
        contents
            .trim()
            .parse::<f32>()
            .map_err(|err| SensorError::Read(format!("{}: {err}", path.display())))
    }

    fn request_frequency(&self, period: Duration) {
        let path = self.device_dir.join(FREQUENCY_FILE);
        if !path.is_file() || period.is_zero() {
            return;
        }
        let hz = 1.0 / period.as_secs_f64();
        if let Err(err) = std::fs::write(&path, format!("{hz:.3}")) {
            debug!(
                path = %path.display(),
                error = %err,
                "Could not set IIO sampling frequency; relying on polling cadence"
            );
        }
    }
}

impl SampleSource for IioAccelerometer {
    fn has_accelerometer(&self) -> bool {
        [X_CHANNEL, Y_CHANNEL, Z_CHANNEL]
            .iter()
            .all(|channel| self.device_dir.join(channel).is_file())
    }

    fn start(&mut self, period: Duration) -> Result<(), SensorError> {
        if !self.has_accelerometer() {
            return Err(SensorError::Unavailable);
        }
        self.scale = match self.read_value(SCALE_FILE) {
            Ok(scale) if scale.is_finite() && scale > 0.0 => scale,
            Ok(scale) => {
                warn!(scale, "Ignoring invalid IIO accelerometer scale");
                1.0
            }
            Err(_) => 1.0,
        };
        self.request_frequency(period);
        self.period = Some(period);
        debug!(
            device = %self.device_dir.display(),
            scale = self.scale,
            period_ms = period.as_millis(),
            "IIO accelerometer armed"
        );
        Ok(())
    }

    fn stop(&mut self) {
        self.period = None;
    }

    fn read_sample(&mut self) -> Result<Sample, SensorError> {
        if self.period.is_none() {
            return Err(SensorError::NotArmed);
        }
        let x = self.read_value(X_CHANNEL)?;
        let y = self.read_value(Y_CHANNEL)?;
        let z = self.read_value(Z_CHANNEL)?;
        Ok(Sample::new(x * self.scale, y * self.scale, z * self.scale))
    }
}
