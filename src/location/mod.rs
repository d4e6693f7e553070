//! Location stream collaborator and location fix handling.

use crate::error::LocationError;
use crate::scheduler::PollingPolicy;
use std::time::SystemTime;
use time::OffsetDateTime;
use time::macros::format_description;

pub mod mock;
pub mod watch;

/// Fixes less accurate than this many metres are dropped.
pub const DEFAULT_MAX_FIX_ACCURACY_M: f64 = 200.0;

/// Source of location fixes that can be (re)started with a polling policy.
pub trait LocationStream: Send {
    fn start(&mut self, policy: PollingPolicy) -> Result<(), LocationError>;

    /// Idempotent; stopping a stopped stream does nothing.
    fn stop(&mut self);

    fn restart(&mut self, policy: PollingPolicy) -> Result<(), LocationError> {
        self.stop();
        self.start(policy)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_m: f64,
    pub timestamp: SystemTime,
    pub is_mock: bool,
}

/// Whether a fix is accurate enough to be forwarded.
pub fn accept_fix(fix: &LocationFix, max_accuracy_m: f64) -> bool {
    fix.accuracy_m.is_finite() && fix.accuracy_m >= 0.0 && fix.accuracy_m <= max_accuracy_m
}

/// Format a fix timestamp as UTC RFC 3339 with millisecond precision.
pub fn format_fix_timestamp(timestamp: SystemTime) -> Result<String, time::error::Format> {
    let format = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    );
    OffsetDateTime::from(timestamp).format(&format)
}
