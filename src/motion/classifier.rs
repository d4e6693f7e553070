use crate::error::{ClassifierError, SensorError};
use crate::motion::MotionState;
use crate::motion::debounce::{Debouncer, StabilityThresholds};
use crate::motion::filter::GravityFilter;
use crate::sensor::{Sample, SampleSource, SensorCapabilities};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MOTION_THRESHOLD: f32 = 0.8;

/// Turns a stream of raw accelerometer samples into a debounced motion state.
///
/// The classifier owns its sample source so that starting, stopping and
/// re-arming delivery stay in step with the filter and debounce state.
pub struct MotionClassifier {
    source: Box<dyn SampleSource>,
    filter: GravityFilter,
    debouncer: Debouncer,
    motion_threshold: f32,
    stability: StabilityThresholds,
    sampling_period: Duration,
    active: bool,
}

impl MotionClassifier {
    pub fn new(source: Box<dyn SampleSource>, alpha: f32) -> Self {
        Self {
            source,
            filter: GravityFilter::new(alpha),
            debouncer: Debouncer::new(),
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
            stability: StabilityThresholds::default(),
            sampling_period: Duration::from_millis(100),
            active: false,
        }
    }

    /// Reset all classification state and begin sampling.
    ///
    /// A no-op while already running; stop first to reset.
    pub fn start(
        &mut self,
        motion_threshold: f32,
        sampling_period: Duration,
    ) -> Result<(), ClassifierError> {
        if self.active {
            return Ok(());
        }
        if !self.source.has_accelerometer() {
            return Err(ClassifierError::SensorUnavailable);
        }

        self.filter.reset();
        self.debouncer.reset();
        self.motion_threshold = motion_threshold;
        self.sampling_period = sampling_period;
        self.source
            .start(sampling_period)
            .map_err(|err| match err {
                SensorError::Unavailable => ClassifierError::SensorUnavailable,
                other => ClassifierError::Sensor(other),
            })?;
        self.active = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.source.stop();
        self.active = false;
    }

    /// Change delivery cadence without touching filter or debounce state.
    ///
    /// The new period is kept only once the source accepts it. On failure the
    /// source is re-armed at the previous period; if that fails too the
    /// classifier goes inactive.
    pub fn set_sampling_period(&mut self, period: Duration) -> Result<(), ClassifierError> {
        if !self.active {
            self.sampling_period = period;
            return Ok(());
        }
        self.source.stop();
        match self.source.start(period) {
            Ok(()) => {
                self.sampling_period = period;
                debug!(period_ms = period.as_millis(), "Sample source re-armed");
                Ok(())
            }
            Err(err) => {
                if let Err(fallback) = self.source.start(self.sampling_period) {
                    warn!(
                        error = %fallback,
                        "Sample source could not be re-armed; sampling stopped"
                    );
                    self.active = false;
                }
                Err(err.into())
            }
        }
    }

    /// Stability counts are coerced to at least 1. Counters are kept.
    pub fn set_thresholds(&mut self, motion_threshold: f32, start_stability: u32, stop_stability: u32) {
        self.motion_threshold = motion_threshold;
        self.stability = StabilityThresholds::new(start_stability, stop_stability);
    }

    /// Read the next sample from the owned source.
    pub fn read_sample(&mut self) -> Result<Sample, ClassifierError> {
        Ok(self.source.read_sample()?)
    }

    /// Process one sample; returns the new state on a confirmed transition.
    pub fn on_sample(&mut self, sample: Sample) -> Option<MotionState> {
        if !self.active {
            return None;
        }
        let magnitude = self.filter.update(sample);
        let raw = if magnitude > self.motion_threshold {
            MotionState::Moving
        } else {
            MotionState::Stationary
        };
        self.debouncer.observe(raw, &self.stability)
    }

    pub fn state(&self) -> MotionState {
        self.debouncer.committed()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn gravity(&self) -> [f32; 3] {
        self.filter.gravity()
    }

    pub fn alpha(&self) -> f32 {
        self.filter.alpha()
    }

    pub fn motion_threshold(&self) -> f32 {
        self.motion_threshold
    }

    pub fn stability(&self) -> StabilityThresholds {
        self.stability
    }

    pub fn sampling_period(&self) -> Duration {
        self.sampling_period
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn capabilities(&self) -> SensorCapabilities {
        self.source.capabilities()
    }
}
