use crate::error::AppError;
use crate::events::{EventSink, MotionEvent};
use crate::motion::MotionState;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tokio::sync::{broadcast, watch};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReport {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub timestamp: String,
    pub is_mock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFailure {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionChange {
    pub state: MotionState,
    pub changed_at: SystemTime,
}

/// Outward view of the notifications emitted by the running session.
#[derive(Debug)]
pub struct AppState {
    motion: Option<MotionChange>,
    motion_tx: watch::Sender<Option<MotionChange>>,
    location: Option<LocationReport>,
    location_error: Option<LocationFailure>,
}

impl AppState {
    pub fn new() -> Self {
        let (motion_tx, _motion_rx) = watch::channel(None);
        Self {
            motion: None,
            motion_tx,
            location: None,
            location_error: None,
        }
    }

    pub fn motion(&self) -> Option<&MotionChange> {
        self.motion.as_ref()
    }

    pub fn subscribe_motion(&self) -> watch::Receiver<Option<MotionChange>> {
        self.motion_tx.subscribe()
    }

    pub fn set_motion(&mut self, change: MotionChange) {
        self.motion = Some(change.clone());
        self.motion_tx.send_replace(Some(change));
    }

    pub fn location(&self) -> Option<&LocationReport> {
        self.location.as_ref()
    }

    pub fn set_location(&mut self, report: LocationReport) {
        self.location = Some(report);
    }

    pub fn location_error(&self) -> Option<&LocationFailure> {
        self.location_error.as_ref()
    }

    pub fn set_location_error(&mut self, failure: Option<LocationFailure>) {
        self.location_error = failure;
    }

    /// Session stopped: its motion state and location failure no longer apply.
    pub fn clear_session(&mut self) {
        self.motion = None;
        self.motion_tx.send_replace(None);
        self.location_error = None;
    }

    /// Fold one outward event into the state.
    pub fn apply_event(&mut self, event: &MotionEvent, now: SystemTime) {
        match event {
            MotionEvent::MotionStateChanged { state } => self.set_motion(MotionChange {
                state: *state,
                changed_at: now,
            }),
            MotionEvent::Location {
                latitude,
                longitude,
                accuracy,
                timestamp,
                is_mock,
            } => {
                self.set_location(LocationReport {
                    latitude: *latitude,
                    longitude: *longitude,
                    accuracy: *accuracy,
                    timestamp: timestamp.clone(),
                    is_mock: *is_mock,
                });
                self.set_location_error(None);
            }
            MotionEvent::LocationError { error, message } => {
                self.set_location_error(Some(LocationFailure {
                    error: error.clone(),
                    message: message.clone(),
                }))
            }
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Event sink that records events in [`AppState`] and rebroadcasts them.
pub struct StateEventSink {
    state: Arc<RwLock<AppState>>,
    events: broadcast::Sender<MotionEvent>,
}

impl StateEventSink {
    pub fn new(state: Arc<RwLock<AppState>>, events: broadcast::Sender<MotionEvent>) -> Self {
        Self { state, events }
    }

    fn record(&self, event: &MotionEvent) -> Result<(), AppError> {
        let mut guard = self.state.write().map_err(|_| AppError::StateLock)?;
        guard.apply_event(event, SystemTime::now());
        Ok(())
    }
}

impl EventSink for StateEventSink {
    fn emit(&self, event: MotionEvent) {
        if let Err(err) = self.record(&event) {
            warn!(error = %err, "Failed to record event in state");
        }
        self.events.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn motion_event_updates_state_and_watch() {
        let mut state = AppState::new();
        let receiver = state.subscribe_motion();
        let now = UNIX_EPOCH + Duration::from_secs(7);

        state.apply_event(
            &MotionEvent::MotionStateChanged {
                state: MotionState::Moving,
            },
            now,
        );

        let expected = MotionChange {
            state: MotionState::Moving,
            changed_at: now,
        };
        assert_eq!(state.motion(), Some(&expected));
        assert_eq!(*receiver.borrow(), Some(expected));
    }

    #[test]
    fn location_clears_previous_error() {
        let mut state = AppState::new();
        state.apply_event(
            &MotionEvent::LocationError {
                error: "START_LOCATION_FAILED".to_string(),
                message: "boom".to_string(),
            },
            UNIX_EPOCH,
        );
        assert!(state.location_error().is_some());

        state.apply_event(
            &MotionEvent::Location {
                latitude: 1.0,
                longitude: 2.0,
                accuracy: 5.0,
                timestamp: "1970-01-01T00:00:00.000Z".to_string(),
                is_mock: false,
            },
            UNIX_EPOCH,
        );

        assert!(state.location_error().is_none());
        assert_eq!(state.location().map(|l| l.accuracy), Some(5.0));
    }

    #[test]
    fn clearing_session_drops_motion_and_location_error() {
        let mut state = AppState::new();
        let receiver = state.subscribe_motion();
        state.apply_event(
            &MotionEvent::MotionStateChanged {
                state: MotionState::Moving,
            },
            UNIX_EPOCH,
        );
        state.apply_event(
            &MotionEvent::LocationError {
                error: "LOCATION_PERMISSION_DENIED".to_string(),
                message: "denied".to_string(),
            },
            UNIX_EPOCH,
        );

        state.clear_session();

        assert!(state.motion().is_none());
        assert!(state.location_error().is_none());
        assert_eq!(*receiver.borrow(), None);
    }

    #[test]
    fn sink_records_and_rebroadcasts() {
        let state = Arc::new(RwLock::new(AppState::new()));
        let (tx, mut rx) = broadcast::channel(4);
        let sink = StateEventSink::new(Arc::clone(&state), tx);
        let event = MotionEvent::MotionStateChanged {
            state: MotionState::Stationary,
        };

        sink.emit(event.clone());

        assert_eq!(rx.try_recv().ok(), Some(event));
        let guard = state.read().expect("state lock");
        assert_eq!(guard.motion().map(|m| m.state), Some(MotionState::Stationary));
    }
}
