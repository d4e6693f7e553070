//! Owns the current detection session and serializes access to it.
//!
//! The sampling thread and the HTTP configuration handlers both go through
//! the same mutex, so setters never race with `on_sample`.

use crate::error::AppError;
use crate::events::EventSink;
use crate::location::{LocationFix, LocationStream};
use crate::motion::MotionState;
use crate::scheduler::PollingPolicy;
use crate::sensor::{SampleSource, SensorCapabilities};
use crate::session::{DetectionSession, PolicyConfig, SessionPhase, SessionSnapshot};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{info, warn};

/// Builds the platform collaborators for each new session.
pub trait SessionFactory: Send + Sync {
    fn sample_source(&self) -> Box<dyn SampleSource>;
    fn location_stream(&self) -> Box<dyn LocationStream>;

    fn capabilities(&self) -> SensorCapabilities {
        self.sample_source().capabilities()
    }
}

pub struct SessionController {
    factory: Box<dyn SessionFactory>,
    sink: Arc<dyn EventSink>,
    config: Mutex<PolicyConfig>,
    session: Mutex<Option<DetectionSession>>,
}

impl SessionController {
    pub fn new(
        factory: Box<dyn SessionFactory>,
        sink: Arc<dyn EventSink>,
        config: PolicyConfig,
    ) -> Self {
        Self {
            factory,
            sink,
            config: Mutex::new(config),
            session: Mutex::new(None),
        }
    }

    fn session(&self) -> Result<MutexGuard<'_, Option<DetectionSession>>, AppError> {
        self.session.lock().map_err(|_| AppError::StateLock)
    }

    fn config_guard(&self) -> Result<MutexGuard<'_, PolicyConfig>, AppError> {
        self.config.lock().map_err(|_| AppError::StateLock)
    }

    /// Start a fresh session. A no-op when one is already running.
    pub fn start(&self) -> Result<SessionSnapshot, AppError> {
        let mut slot = self.session()?;
        if let Some(session) = slot.as_ref() {
            return Ok(session.snapshot());
        }
        let config = *self.config_guard()?;
        let session = DetectionSession::start(
            config,
            self.factory.sample_source(),
            self.factory.location_stream(),
            Arc::clone(&self.sink),
        )?;
        let snapshot = session.snapshot();
        *slot = Some(session);
        Ok(snapshot)
    }

    /// Stop and discard the running session. Returns whether one was running.
    pub fn stop(&self) -> Result<bool, AppError> {
        let session = self.session()?.take();
        match session {
            Some(session) => {
                session.stop();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_running(&self) -> Result<bool, AppError> {
        Ok(self.session()?.is_some())
    }

    /// Read and classify one sample from the running session.
    pub fn tick(&self) -> Result<Option<MotionState>, AppError> {
        let mut slot = self.session()?;
        let session = slot.as_mut().ok_or(AppError::NoSession)?;
        session.tick()
    }

    /// Current sampling period of the running session, or the configured one.
    pub fn sampling_period(&self) -> Result<Duration, AppError> {
        if let Some(session) = self.session()?.as_ref() {
            return Ok(session.sampling_period());
        }
        Ok(self.config_guard()?.sampling_period)
    }

    pub fn set_thresholds(
        &self,
        motion_threshold: f32,
        start_stability: u32,
        stop_stability: u32,
    ) -> Result<PolicyConfig, AppError> {
        if !motion_threshold.is_finite() || motion_threshold < 0.0 {
            return Err(AppError::ConfigurationRejected(format!(
                "motion threshold must be a non-negative number, got {motion_threshold}"
            )));
        }
        let mut slot = self.session()?;
        let mut config = self.config_guard()?;
        config.motion_threshold = motion_threshold;
        *config = config.with_stability(start_stability, stop_stability);
        if let Some(session) = slot.as_mut() {
            session.set_thresholds(motion_threshold, start_stability, stop_stability);
        }
        info!(
            motion_threshold,
            start_stability = config.start_stability,
            stop_stability = config.stop_stability,
            "Thresholds updated"
        );
        Ok(*config)
    }

    /// Update polling intervals. While moving, the new moving interval is
    /// applied immediately instead of waiting for the next transition.
    pub fn set_intervals(&self, moving: Duration, stationary: Duration) -> Result<PolicyConfig, AppError> {
        if moving.is_zero() || stationary.is_zero() {
            return Err(AppError::ConfigurationRejected(
                "polling intervals must be non-zero".to_string(),
            ));
        }
        let mut slot = self.session()?;
        let mut config = self.config_guard()?;
        *config = config.with_intervals(moving, stationary);
        info!(
            moving_interval_ms = moving.as_millis(),
            stationary_interval_ms = stationary.as_millis(),
            "Polling intervals updated"
        );
        if let Some(session) = slot.as_mut() {
            session.set_intervals(moving, stationary);
            if session.state() == MotionState::Moving {
                session.retry_policy()?;
            }
        }
        Ok(*config)
    }

    /// Change the sampling period. A session whose source cannot be re-armed
    /// at either period is stopped and discarded.
    pub fn set_sampling_period(&self, period: Duration) -> Result<PolicyConfig, AppError> {
        let mut slot = self.session()?;
        let mut config = self.config_guard()?;
        if let Some(session) = slot.as_mut()
            && let Err(err) = session.set_sampling_period(period)
        {
            if session.phase() == SessionPhase::Idle
                && let Some(session) = slot.take()
            {
                session.stop();
                warn!("Detection session ended: sample source could not be re-armed");
            }
            return Err(err.into());
        }
        *config = config.with_sampling_period(period);
        info!(
            sampling_period_ms = config.sampling_period.as_millis(),
            "Sampling period updated"
        );
        Ok(*config)
    }

    /// Override the polling interval directly; priority follows the interval.
    pub fn set_polling_interval(&self, interval: Duration) -> Result<PollingPolicy, AppError> {
        if interval.is_zero() {
            return Err(AppError::ConfigurationRejected(
                "polling interval must be non-zero".to_string(),
            ));
        }
        let mut slot = self.session()?;
        let session = slot.as_mut().ok_or(AppError::NoSession)?;
        let policy = PollingPolicy::for_interval(interval);
        session.apply_policy(policy)?;
        Ok(policy)
    }

    /// Retry applying the policy for the committed state after a failure.
    pub fn retry_policy(&self) -> Result<PollingPolicy, AppError> {
        let mut slot = self.session()?;
        let session = slot.as_mut().ok_or(AppError::NoSession)?;
        Ok(session.retry_policy()?)
    }

    pub fn on_location_fix(&self, fix: &LocationFix) -> Result<bool, AppError> {
        let slot = self.session()?;
        let session = slot.as_ref().ok_or(AppError::NoSession)?;
        Ok(session.on_location_fix(fix))
    }

    pub fn snapshot(&self) -> Result<Option<SessionSnapshot>, AppError> {
        Ok(self.session()?.as_ref().map(DetectionSession::snapshot))
    }

    pub fn config(&self) -> Result<PolicyConfig, AppError> {
        Ok(*self.config_guard()?)
    }

    pub fn capabilities(&self) -> SensorCapabilities {
        self.factory.capabilities()
    }
}
