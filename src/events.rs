//! Outward notifications for subscribers outside the detection core.

use crate::error::LocationError;
use crate::location::{LocationFix, format_fix_timestamp};
use crate::motion::MotionState;
use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MotionEvent {
    MotionStateChanged {
        state: MotionState,
    },
    Location {
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        timestamp: String,
        is_mock: bool,
    },
    LocationError {
        error: String,
        message: String,
    },
}

impl MotionEvent {
    pub fn location(fix: &LocationFix) -> Result<Self, time::error::Format> {
        Ok(MotionEvent::Location {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix.accuracy_m,
            timestamp: format_fix_timestamp(fix.timestamp)?,
            is_mock: fix.is_mock,
        })
    }

    pub fn location_error(err: &LocationError) -> Self {
        MotionEvent::LocationError {
            error: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: MotionEvent);
}

/// Broadcast channels accept events with or without subscribers.
impl EventSink for broadcast::Sender<MotionEvent> {
    fn emit(&self, event: MotionEvent) {
        let _ = self.send(event);
    }
}

/// Adapts a closure into an [`EventSink`].
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(MotionEvent) + Send + Sync,
{
    fn emit(&self, event: MotionEvent) {
        (self.0)(event)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: MotionEvent) {}
}
