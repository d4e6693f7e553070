//! One detection session: classifier, scheduler and their configuration.
//!
//! A session is created on start and consumed on stop, so every new session
//! begins from a zeroed filter, a STATIONARY state and no active policy.

use crate::error::{AppError, ClassifierError, SchedulerError};
use crate::events::{EventSink, MotionEvent};
use crate::location::{DEFAULT_MAX_FIX_ACCURACY_M, LocationFix, LocationStream, accept_fix};
use crate::motion::MotionState;
use crate::motion::classifier::{DEFAULT_MOTION_THRESHOLD, MotionClassifier};
use crate::motion::debounce::{DEFAULT_START_STABILITY, DEFAULT_STOP_STABILITY};
use crate::motion::filter::DEFAULT_ALPHA;
use crate::scheduler::{
    AdaptiveScheduler, DEFAULT_MOVING_INTERVAL, DEFAULT_STATIONARY_INTERVAL, PollingIntervals,
    PollingPolicy,
};
use crate::sensor::{
    MIN_SAMPLING_PERIOD, Sample, SampleSource, SensorCapabilities, clamp_sampling_period,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyConfig {
    pub motion_threshold: f32,
    pub alpha: f32,
    pub start_stability: u32,
    pub stop_stability: u32,
    pub sampling_period: Duration,
    pub moving_interval: Duration,
    pub stationary_interval: Duration,
    pub max_fix_accuracy_m: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
            alpha: DEFAULT_ALPHA,
            start_stability: DEFAULT_START_STABILITY,
            stop_stability: DEFAULT_STOP_STABILITY,
            sampling_period: MIN_SAMPLING_PERIOD,
            moving_interval: DEFAULT_MOVING_INTERVAL,
            stationary_interval: DEFAULT_STATIONARY_INTERVAL,
            max_fix_accuracy_m: DEFAULT_MAX_FIX_ACCURACY_M,
        }
    }
}

impl PolicyConfig {
    pub fn with_stability(mut self, start: u32, stop: u32) -> Self {
        self.start_stability = start.max(1);
        self.stop_stability = stop.max(1);
        self
    }

    pub fn with_sampling_period(mut self, period: Duration) -> Self {
        self.sampling_period = clamp_sampling_period(period);
        self
    }

    pub fn with_intervals(mut self, moving: Duration, stationary: Duration) -> Self {
        self.moving_interval = moving;
        self.stationary_interval = stationary;
        self
    }

    pub fn intervals(&self) -> PollingIntervals {
        PollingIntervals {
            moving: self.moving_interval,
            stationary: self.stationary_interval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Idle,
    StationaryPolling,
    MovingPolling,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: MotionState,
    pub phase: SessionPhase,
    pub active_policy: Option<PollingPolicy>,
    /// False while the location stream is down after a failed restart.
    pub location_streaming: bool,
    pub config: PolicyConfig,
}

pub struct DetectionSession {
    config: PolicyConfig,
    classifier: MotionClassifier,
    scheduler: AdaptiveScheduler,
    sink: Arc<dyn EventSink>,
}

impl DetectionSession {
    /// Start sampling and apply the stationary policy.
    ///
    /// Fails only when no accelerometer is available. A location stream that
    /// cannot be acquired is reported to the sink and retried on the next
    /// transition or an explicit [`DetectionSession::retry_policy`].
    pub fn start(
        config: PolicyConfig,
        source: Box<dyn SampleSource>,
        stream: Box<dyn LocationStream>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ClassifierError> {
        let config = config
            .with_stability(config.start_stability, config.stop_stability)
            .with_sampling_period(config.sampling_period);
        let mut classifier = MotionClassifier::new(source, config.alpha);
        classifier.set_thresholds(
            config.motion_threshold,
            config.start_stability,
            config.stop_stability,
        );
        classifier.start(config.motion_threshold, config.sampling_period)?;

        let mut session = Self {
            config,
            classifier,
            scheduler: AdaptiveScheduler::new(stream, config.intervals()),
            sink,
        };
        info!(
            motion_threshold = config.motion_threshold,
            start_stability = config.start_stability,
            stop_stability = config.stop_stability,
            sampling_period_ms = config.sampling_period.as_millis(),
            "Detection session started"
        );

        if let Err(err) = session.scheduler.on_motion_state_changed(MotionState::Stationary) {
            session.report_stream_error(&err);
        }
        Ok(session)
    }

    /// Halt sampling and location updates. The session's state is discarded.
    pub fn stop(mut self) {
        self.classifier.stop();
        self.scheduler.shutdown();
        info!(state = self.state().as_str(), "Detection session stopped");
    }

    /// Classify one sample and, on a confirmed transition, notify the sink
    /// and apply the matching polling policy.
    ///
    /// The committed state survives a failed policy application; the error is
    /// returned so the caller can retry.
    pub fn on_sample(&mut self, sample: Sample) -> Result<Option<MotionState>, SchedulerError> {
        let Some(state) = self.classifier.on_sample(sample) else {
            return Ok(None);
        };

        info!(state = state.as_str(), "Motion state changed");
        self.sink.emit(MotionEvent::MotionStateChanged { state });

        match self.scheduler.on_motion_state_changed(state) {
            Ok(_) => Ok(Some(state)),
            Err(err) => {
                self.report_stream_error(&err);
                Err(err)
            }
        }
    }

    /// Read one sample from the session's source and classify it.
    pub fn tick(&mut self) -> Result<Option<MotionState>, AppError> {
        let sample = self.classifier.read_sample()?;
        Ok(self.on_sample(sample)?)
    }

    /// Forward a location fix to the sink if it is accurate enough.
    pub fn on_location_fix(&self, fix: &LocationFix) -> bool {
        if !accept_fix(fix, self.config.max_fix_accuracy_m) {
            debug!(
                accuracy_m = fix.accuracy_m,
                max_accuracy_m = self.config.max_fix_accuracy_m,
                "Dropping inaccurate location fix"
            );
            return false;
        }
        match MotionEvent::location(fix) {
            Ok(event) => {
                self.sink.emit(event);
                true
            }
            Err(err) => {
                warn!(error = %err, "Failed to format location fix timestamp");
                false
            }
        }
    }

    pub fn set_thresholds(&mut self, motion_threshold: f32, start_stability: u32, stop_stability: u32) {
        self.config.motion_threshold = motion_threshold;
        self.config = self.config.with_stability(start_stability, stop_stability);
        self.classifier.set_thresholds(
            self.config.motion_threshold,
            self.config.start_stability,
            self.config.stop_stability,
        );
    }

    /// Update polling intervals for future transitions without a restart.
    pub fn set_intervals(&mut self, moving: Duration, stationary: Duration) {
        self.config = self.config.with_intervals(moving, stationary);
        self.scheduler.set_intervals(moving, stationary);
    }

    /// Re-arm the sample source at a new period; filter and debounce state are kept.
    pub fn set_sampling_period(&mut self, period: Duration) -> Result<(), ClassifierError> {
        let requested = self.config.with_sampling_period(period);
        self.classifier
            .set_sampling_period(requested.sampling_period)
            .inspect_err(|err| warn!(error = %err, "Sampling period change failed"))?;
        self.config = requested;
        Ok(())
    }

    /// Re-derive the policy for the committed state and apply it.
    pub fn retry_policy(&mut self) -> Result<PollingPolicy, SchedulerError> {
        let state = self.state();
        self.scheduler.reapply(state).inspect_err(|err| {
            self.report_stream_error(err);
        })
    }

    /// Apply an explicit policy, bypassing the motion mapping.
    pub fn apply_policy(&mut self, policy: PollingPolicy) -> Result<(), SchedulerError> {
        self.scheduler.apply_policy(policy).inspect_err(|err| {
            self.report_stream_error(err);
        })
    }

    pub fn state(&self) -> MotionState {
        self.classifier.state()
    }

    pub fn phase(&self) -> SessionPhase {
        if !self.classifier.is_active() {
            return SessionPhase::Idle;
        }
        match self.state() {
            MotionState::Stationary => SessionPhase::StationaryPolling,
            MotionState::Moving => SessionPhase::MovingPolling,
        }
    }

    pub fn active_policy(&self) -> Option<PollingPolicy> {
        self.scheduler.active_policy()
    }

    pub fn config(&self) -> PolicyConfig {
        self.config
    }

    pub fn sampling_period(&self) -> Duration {
        self.config.sampling_period
    }

    /// Current gravity estimate of the low-pass filter.
    pub fn gravity(&self) -> [f32; 3] {
        self.classifier.gravity()
    }

    pub fn capabilities(&self) -> SensorCapabilities {
        self.classifier.capabilities()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state(),
            phase: self.phase(),
            active_policy: self.active_policy(),
            location_streaming: self.scheduler.is_streaming(),
            config: self.config,
        }
    }

    fn report_stream_error(&self, err: &SchedulerError) {
        let SchedulerError::StreamRestartFailed(cause) = err;
        self.sink.emit(MotionEvent::location_error(cause));
    }
}
