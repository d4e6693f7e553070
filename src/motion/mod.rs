//! Accelerometer motion classification.
//!
//! A [`filter::GravityFilter`] isolates linear acceleration, a magnitude
//! threshold turns each sample into a raw decision, and a
//! [`debounce::Debouncer`] commits a state only after enough consecutive
//! agreeing decisions.

use serde::{Deserialize, Serialize};

pub mod classifier;
pub mod debounce;
pub mod filter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MotionState {
    #[default]
    Stationary,
    Moving,
}

impl MotionState {
    pub fn as_str(self) -> &'static str {
        match self {
            MotionState::Stationary => "STATIONARY",
            MotionState::Moving => "MOVING",
        }
    }
}
