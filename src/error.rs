use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("accelerometer not available")]
    Unavailable,
    #[error("sample source not armed")]
    NotArmed,
    #[error("sample read failed: {0}")]
    Read(String),
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("accelerometer not available on this device")]
    SensorUnavailable,
    #[error("sensor error: {0}")]
    Sensor(#[from] SensorError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission is not granted")]
    PermissionDenied,
    #[error("location stream unavailable: {0}")]
    Unavailable(String),
}

impl LocationError {
    /// Code reported to outward subscribers in `location_error` events.
    pub fn code(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => "LOCATION_PERMISSION_DENIED",
            LocationError::Unavailable(_) => "START_LOCATION_FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("location stream restart failed: {0}")]
    StreamRestartFailed(#[from] LocationError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error("no detection session is running")]
    NoSession,
    #[error("configuration rejected: {0}")]
    ConfigurationRejected(String),
    #[error("state lock poisoned")]
    StateLock,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_error_codes_are_stable() {
        assert_eq!(
            LocationError::PermissionDenied.code(),
            "LOCATION_PERMISSION_DENIED"
        );
        assert_eq!(
            LocationError::Unavailable("gone".to_string()).code(),
            "START_LOCATION_FAILED"
        );
    }

    #[test]
    fn scheduler_error_wraps_location_error() {
        let err = SchedulerError::from(LocationError::PermissionDenied);

        assert_eq!(
            err.to_string(),
            "location stream restart failed: location permission is not granted"
        );
    }
}
