//! Maps committed motion states onto location polling policies.

use crate::error::SchedulerError;
use crate::location::LocationStream;
use crate::motion::MotionState;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_MOVING_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_STATIONARY_INTERVAL: Duration = Duration::from_secs(180);
/// Intervals shorter than this warrant high-accuracy fixes.
pub const HIGH_ACCURACY_CUTOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    HighAccuracy,
    BalancedPower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PollingPolicy {
    pub priority: Priority,
    pub interval_ms: u64,
}

impl PollingPolicy {
    pub fn new(priority: Priority, interval: Duration) -> Self {
        Self {
            priority,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Policy for a manually requested interval; fast polling gets high accuracy.
    pub fn for_interval(interval: Duration) -> Self {
        let priority = if interval < HIGH_ACCURACY_CUTOFF {
            Priority::HighAccuracy
        } else {
            Priority::BalancedPower
        };
        Self::new(priority, interval)
    }

}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingIntervals {
    pub moving: Duration,
    pub stationary: Duration,
}

impl PollingIntervals {
    pub fn policy_for(&self, state: MotionState) -> PollingPolicy {
        match state {
            MotionState::Moving => PollingPolicy::new(Priority::HighAccuracy, self.moving),
            MotionState::Stationary => {
                PollingPolicy::new(Priority::BalancedPower, self.stationary)
            }
        }
    }
}

impl Default for PollingIntervals {
    fn default() -> Self {
        Self {
            moving: DEFAULT_MOVING_INTERVAL,
            stationary: DEFAULT_STATIONARY_INTERVAL,
        }
    }
}

pub struct AdaptiveScheduler {
    stream: Box<dyn LocationStream>,
    intervals: PollingIntervals,
    active: Option<PollingPolicy>,
    /// False after a failed restart: the stream was stopped but not restarted.
    streaming: bool,
}

impl AdaptiveScheduler {
    pub fn new(stream: Box<dyn LocationStream>, intervals: PollingIntervals) -> Self {
        Self {
            stream,
            intervals,
            active: None,
            streaming: false,
        }
    }

    pub fn on_motion_state_changed(
        &mut self,
        state: MotionState,
    ) -> Result<PollingPolicy, SchedulerError> {
        let policy = self.intervals.policy_for(state);
        self.apply_policy(policy)?;
        Ok(policy)
    }

    /// Restart the location stream with `policy` unless it is already active
    /// and the stream is running.
    ///
    /// On failure the previously active policy is kept but the stream is
    /// marked down, so the next request for that policy restarts it.
    pub fn apply_policy(&mut self, policy: PollingPolicy) -> Result<(), SchedulerError> {
        if self.streaming && self.active == Some(policy) {
            debug!(
                priority = ?policy.priority,
                interval_ms = policy.interval_ms,
                "Polling policy unchanged, skipping restart"
            );
            return Ok(());
        }

        if let Err(err) = self.stream.restart(policy) {
            self.streaming = false;
            warn!(
                priority = ?policy.priority,
                interval_ms = policy.interval_ms,
                error = %err,
                "Location stream restart failed"
            );
            return Err(SchedulerError::StreamRestartFailed(err));
        }

        info!(
            priority = ?policy.priority,
            interval_ms = policy.interval_ms,
            "Polling policy applied"
        );
        self.active = Some(policy);
        self.streaming = true;
        Ok(())
    }

    /// Update intervals for future transitions. Never restarts the stream.
    pub fn set_intervals(&mut self, moving: Duration, stationary: Duration) {
        self.intervals = PollingIntervals { moving, stationary };
    }

    /// Re-derive the policy for `state` from the current intervals and apply it.
    pub fn reapply(&mut self, state: MotionState) -> Result<PollingPolicy, SchedulerError> {
        self.on_motion_state_changed(state)
    }

    /// Stop the location stream and forget the active policy.
    pub fn shutdown(&mut self) {
        self.stream.stop();
        self.active = None;
        self.streaming = false;
    }

    pub fn active_policy(&self) -> Option<PollingPolicy> {
        self.active
    }

    /// Whether the location stream is running with the active policy.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn intervals(&self) -> PollingIntervals {
        self.intervals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocationError;
    use crate::location::mock::MockLocationStream;

    fn scheduler() -> (AdaptiveScheduler, MockLocationStream) {
        let stream = MockLocationStream::new();
        let scheduler = AdaptiveScheduler::new(Box::new(stream.clone()), PollingIntervals::default());
        (scheduler, stream)
    }

    #[test]
    fn moving_maps_to_high_accuracy() {
        let (mut scheduler, stream) = scheduler();

        let policy = scheduler
            .on_motion_state_changed(MotionState::Moving)
            .expect("apply ok");

        assert_eq!(policy, PollingPolicy::new(Priority::HighAccuracy, Duration::from_secs(30)));
        assert_eq!(stream.starts(), vec![policy]);
        assert_eq!(scheduler.active_policy(), Some(policy));
    }

    #[test]
    fn stationary_maps_to_balanced_heartbeat() {
        let (mut scheduler, stream) = scheduler();

        let policy = scheduler
            .on_motion_state_changed(MotionState::Stationary)
            .expect("apply ok");

        assert_eq!(policy.priority, Priority::BalancedPower);
        assert_eq!(policy.interval_ms, 180_000);
        assert_eq!(stream.starts().len(), 1);
    }

    #[test]
    fn identical_policy_restarts_once() {
        let (mut scheduler, stream) = scheduler();
        let policy = PollingPolicy::new(Priority::HighAccuracy, Duration::from_secs(30));

        scheduler.apply_policy(policy).expect("first apply");
        scheduler.apply_policy(policy).expect("second apply");

        assert_eq!(stream.starts(), vec![policy]);
    }

    #[test]
    fn same_interval_different_priority_restarts() {
        let (mut scheduler, stream) = scheduler();

        scheduler
            .apply_policy(PollingPolicy::new(Priority::HighAccuracy, Duration::from_secs(60)))
            .expect("first apply");
        scheduler
            .apply_policy(PollingPolicy::new(Priority::BalancedPower, Duration::from_secs(60)))
            .expect("second apply");

        assert_eq!(stream.starts().len(), 2);
    }

    #[test]
    fn failed_restart_keeps_previous_policy() {
        let (mut scheduler, stream) = scheduler();
        let stationary = scheduler
            .on_motion_state_changed(MotionState::Stationary)
            .expect("apply ok");
        stream.fail_next(LocationError::PermissionDenied);

        let result = scheduler.on_motion_state_changed(MotionState::Moving);

        assert_eq!(
            result,
            Err(SchedulerError::StreamRestartFailed(LocationError::PermissionDenied))
        );
        assert_eq!(scheduler.active_policy(), Some(stationary));

        let retried = scheduler
            .on_motion_state_changed(MotionState::Moving)
            .expect("retry ok");
        assert_eq!(scheduler.active_policy(), Some(retried));
    }

    #[test]
    fn return_to_previous_state_after_failed_restart_restarts_stream() {
        let (mut scheduler, stream) = scheduler();
        let stationary = scheduler
            .on_motion_state_changed(MotionState::Stationary)
            .expect("apply ok");
        stream.fail_next(LocationError::PermissionDenied);
        assert!(scheduler.on_motion_state_changed(MotionState::Moving).is_err());
        assert_eq!(stream.running(), None);
        assert!(!scheduler.is_streaming());

        let policy = scheduler
            .on_motion_state_changed(MotionState::Stationary)
            .expect("apply ok");

        assert_eq!(policy, stationary);
        assert_eq!(stream.running(), Some(stationary));
        assert_eq!(stream.starts(), vec![stationary, stationary]);
        assert!(scheduler.is_streaming());
    }

    #[test]
    fn set_intervals_does_not_restart() {
        let (mut scheduler, stream) = scheduler();
        scheduler
            .on_motion_state_changed(MotionState::Stationary)
            .expect("apply ok");

        scheduler.set_intervals(Duration::from_secs(10), Duration::from_secs(600));

        assert_eq!(stream.starts().len(), 1);
        assert_eq!(scheduler.intervals().moving, Duration::from_secs(10));
    }

    #[test]
    fn reapply_picks_up_new_moving_interval() {
        let (mut scheduler, stream) = scheduler();
        scheduler
            .on_motion_state_changed(MotionState::Moving)
            .expect("apply ok");
        scheduler.set_intervals(Duration::from_secs(10), Duration::from_secs(180));

        let policy = scheduler.reapply(MotionState::Moving).expect("reapply ok");

        assert_eq!(policy.interval_ms, 10_000);
        assert_eq!(stream.starts().len(), 2);
    }

    #[test]
    fn interval_below_cutoff_uses_high_accuracy() {
        assert_eq!(
            PollingPolicy::for_interval(Duration::from_secs(59)).priority,
            Priority::HighAccuracy
        );
        assert_eq!(
            PollingPolicy::for_interval(Duration::from_secs(60)).priority,
            Priority::BalancedPower
        );
    }

    #[test]
    fn shutdown_stops_stream_and_clears_policy() {
        let (mut scheduler, stream) = scheduler();
        scheduler
            .on_motion_state_changed(MotionState::Moving)
            .expect("apply ok");

        scheduler.shutdown();

        assert_eq!(scheduler.active_policy(), None);
        assert!(stream.running().is_none());
    }
}
