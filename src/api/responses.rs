use crate::motion::MotionState;
use crate::scheduler::PollingPolicy;
use crate::session::{PolicyConfig, SessionPhase};
use crate::state::{LocationFailure, LocationReport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MotionResponse {
    pub state: Option<MotionState>,
    pub phase: SessionPhase,
    pub active_policy: Option<PollingPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_at: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
    Ko,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LocationStatusResponse {
    pub requested_policy: Option<PollingPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fix: Option<LocationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<LocationFailure>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FixAcceptedResponse {
    pub accepted: bool,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyResponse {
    pub policy: PollingPolicy,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ConfigResponse {
    pub motion_threshold: f32,
    pub start_stability: u32,
    pub stop_stability: u32,
    pub sampling_period_ms: u64,
    pub moving_interval_ms: u64,
    pub stationary_interval_ms: u64,
}

impl From<PolicyConfig> for ConfigResponse {
    fn from(config: PolicyConfig) -> Self {
        Self {
            motion_threshold: config.motion_threshold,
            start_stability: config.start_stability,
            stop_stability: config.stop_stability,
            sampling_period_ms: millis(config.sampling_period),
            moving_interval_ms: millis(config.moving_interval),
            stationary_interval_ms: millis(config.stationary_interval),
        }
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionResponse {
    pub running: bool,
    pub phase: SessionPhase,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ErrorResponse {
    pub error_code: ErrorCode,
    pub error_message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NoSession,
    SensorUnavailable,
    SensorError,
    StreamRestartFailed,
    ConfigurationRejected,
    InternalError,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdsRequest {
    pub motion_threshold: f32,
    pub start_stability: u32,
    pub stop_stability: u32,
}

#[derive(Debug, Deserialize)]
pub struct IntervalsRequest {
    pub moving_interval_ms: u64,
    pub stationary_interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct SamplingRequest {
    pub sampling_period_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct PollingIntervalRequest {
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct LocationFixRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    #[serde(default)]
    pub is_mock: bool,
}
