use crate::api::ApiContext;
use crate::api::responses::{
    ConfigResponse, ErrorCode, ErrorResponse, FixAcceptedResponse, HealthResponse, HealthStatus,
    IntervalsRequest, LocationFixRequest, LocationStatusResponse, MotionResponse,
    PolicyResponse, PollingIntervalRequest, SamplingRequest, SessionResponse, ThresholdsRequest,
};
use crate::controller::SessionController;
use crate::error::{AppError, ClassifierError};
use crate::location::LocationFix;
use crate::scheduler::PollingPolicy;
use crate::sensor::SensorCapabilities;
use crate::session::SessionPhase;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::watch;
use tracing::{error, warn};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
enum TimestampError {
    #[error("timestamp format error: {0}")]
    Format(#[from] time::error::Format),
}

pub enum ApiResponse<T> {
    Success { status: StatusCode, body: T },
    Error { status: StatusCode, body: ErrorResponse },
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self {
            ApiResponse::Success { status, body } => (status, Json(body)).into_response(),
            ApiResponse::Error { status, body } => (status, Json(body)).into_response(),
        }
    }
}

fn ok<T>(body: T) -> ApiResponse<T> {
    ApiResponse::Success {
        status: StatusCode::OK,
        body,
    }
}

pub async fn get_motion(State(ctx): State<ApiContext>) -> impl IntoResponse {
    build_motion_response(&ctx.controller, &ctx.state, SystemTime::now())
}

pub async fn get_health(State(ctx): State<ApiContext>) -> impl IntoResponse {
    build_health_response(&ctx.controller, &ctx.state, SystemTime::now())
}

pub async fn get_capabilities(State(ctx): State<ApiContext>) -> Json<SensorCapabilities> {
    Json(ctx.controller.capabilities())
}

pub async fn get_location(State(ctx): State<ApiContext>) -> impl IntoResponse {
    build_location_response(&ctx.state, &ctx.location_request, SystemTime::now())
}

pub async fn post_location(
    State(ctx): State<ApiContext>,
    Json(request): Json<LocationFixRequest>,
) -> impl IntoResponse {
    build_fix_response(&ctx.controller, request, SystemTime::now())
}

pub async fn put_polling_interval(
    State(ctx): State<ApiContext>,
    Json(request): Json<PollingIntervalRequest>,
) -> impl IntoResponse {
    let now = SystemTime::now();
    match ctx
        .controller
        .set_polling_interval(Duration::from_millis(request.interval_ms))
    {
        Ok(policy) => with_timestamp(now, |timestamp| PolicyResponse { policy, timestamp }),
        Err(err) => app_error(&err, now),
    }
}

pub async fn post_session_start(State(ctx): State<ApiContext>) -> impl IntoResponse {
    build_start_response(&ctx.controller, SystemTime::now())
}

pub async fn post_session_stop(State(ctx): State<ApiContext>) -> impl IntoResponse {
    build_stop_response(&ctx.controller, &ctx.state, SystemTime::now())
}

pub async fn get_config(State(ctx): State<ApiContext>) -> impl IntoResponse {
    config_result(ctx.controller.config(), SystemTime::now())
}

pub async fn put_thresholds(
    State(ctx): State<ApiContext>,
    Json(request): Json<ThresholdsRequest>,
) -> impl IntoResponse {
    let result = ctx.controller.set_thresholds(
        request.motion_threshold,
        request.start_stability,
        request.stop_stability,
    );
    config_result(result, SystemTime::now())
}

pub async fn put_intervals(
    State(ctx): State<ApiContext>,
    Json(request): Json<IntervalsRequest>,
) -> impl IntoResponse {
    let result = ctx.controller.set_intervals(
        Duration::from_millis(request.moving_interval_ms),
        Duration::from_millis(request.stationary_interval_ms),
    );
    config_result(result, SystemTime::now())
}

pub async fn put_sampling(
    State(ctx): State<ApiContext>,
    Json(request): Json<SamplingRequest>,
) -> impl IntoResponse {
    let result = ctx
        .controller
        .set_sampling_period(Duration::from_millis(request.sampling_period_ms));
    config_result(result, SystemTime::now())
}

fn config_result(
    result: Result<crate::session::PolicyConfig, AppError>,
    now: SystemTime,
) -> ApiResponse<ConfigResponse> {
    match result {
        Ok(config) => ok(ConfigResponse::from(config)),
        Err(err) => app_error(&err, now),
    }
}

fn build_motion_response(
    controller: &SessionController,
    state: &Arc<RwLock<AppState>>,
    now: SystemTime,
) -> ApiResponse<MotionResponse> {
    let snapshot = match controller.snapshot() {
        Ok(snapshot) => snapshot,
        Err(err) => return app_error(&err, now),
    };
    let changed_at = match state.read() {
        Ok(guard) => guard.motion().map(|m| m.changed_at),
        Err(_) => return internal_error("state lock poisoned while reading motion", now),
    };
    let changed_at = match changed_at.map(format_timestamp).transpose() {
        Ok(formatted) => formatted,
        Err(_) => return internal_error("timestamp formatting failure", now),
    };

    with_timestamp(now, |timestamp| match snapshot {
        Some(snapshot) => MotionResponse {
            state: Some(snapshot.state),
            phase: snapshot.phase,
            active_policy: snapshot.active_policy,
            changed_at,
            timestamp,
        },
        None => MotionResponse {
            state: None,
            phase: SessionPhase::Idle,
            active_policy: None,
            changed_at: None,
            timestamp,
        },
    })
}

fn build_health_response(
    controller: &SessionController,
    state: &Arc<RwLock<AppState>>,
    now: SystemTime,
) -> ApiResponse<HealthResponse> {
    let streaming = match controller.snapshot() {
        Ok(snapshot) => snapshot.map(|s| s.location_streaming),
        Err(err) => return app_error(&err, now),
    };
    let has_location_error = match state.read() {
        Ok(guard) => guard.location_error().is_some(),
        Err(_) => return internal_error("state lock poisoned while reading health", now),
    };

    let status = match (streaming, has_location_error) {
        (None, _) => HealthStatus::Ko,
        (Some(false), _) | (Some(true), true) => HealthStatus::Degraded,
        (Some(true), false) => HealthStatus::Ok,
    };
    let status_code = match status {
        HealthStatus::Ko => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Ok | HealthStatus::Degraded => StatusCode::OK,
    };

    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Success {
            status: status_code,
            body: HealthResponse { status, timestamp },
        },
        Err(_) => internal_error("timestamp formatting failure", now),
    }
}

fn build_location_response(
    state: &Arc<RwLock<AppState>>,
    location_request: &watch::Receiver<Option<PollingPolicy>>,
    now: SystemTime,
) -> ApiResponse<LocationStatusResponse> {
    let (last_fix, last_error) = match state.read() {
        Ok(guard) => (guard.location().cloned(), guard.location_error().cloned()),
        Err(_) => return internal_error("state lock poisoned while reading location", now),
    };
    let requested_policy = *location_request.borrow();

    with_timestamp(now, |timestamp| LocationStatusResponse {
        requested_policy,
        last_fix,
        last_error,
        timestamp,
    })
}

fn build_fix_response(
    controller: &SessionController,
    request: LocationFixRequest,
    now: SystemTime,
) -> ApiResponse<FixAcceptedResponse> {
    let fix = LocationFix {
        latitude: request.latitude,
        longitude: request.longitude,
        accuracy_m: request.accuracy,
        timestamp: UNIX_EPOCH + Duration::from_millis(request.timestamp_ms),
        is_mock: request.is_mock,
    };
    match controller.on_location_fix(&fix) {
        Ok(accepted) => with_timestamp(now, |timestamp| FixAcceptedResponse {
            accepted,
            timestamp,
        }),
        Err(err) => app_error(&err, now),
    }
}

fn build_start_response(controller: &SessionController, now: SystemTime) -> ApiResponse<SessionResponse> {
    match controller.start() {
        Ok(snapshot) => with_timestamp(now, |timestamp| SessionResponse {
            running: true,
            phase: snapshot.phase,
            timestamp,
        }),
        Err(err) => app_error(&err, now),
    }
}

fn build_stop_response(
    controller: &SessionController,
    state: &Arc<RwLock<AppState>>,
    now: SystemTime,
) -> ApiResponse<SessionResponse> {
    if let Err(err) = controller.stop() {
        return app_error(&err, now);
    }
    match state.write() {
        Ok(mut guard) => guard.clear_session(),
        Err(_) => return internal_error("state lock poisoned while clearing motion", now),
    }
    with_timestamp(now, |timestamp| SessionResponse {
        running: false,
        phase: SessionPhase::Idle,
        timestamp,
    })
}

fn with_timestamp<T>(now: SystemTime, build: impl FnOnce(String) -> T) -> ApiResponse<T> {
    match format_timestamp(now) {
        Ok(timestamp) => ok(build(timestamp)),
        Err(_) => internal_error("timestamp formatting failure", now),
    }
}

fn app_error<T>(err: &AppError, now: SystemTime) -> ApiResponse<T> {
    let (status, error_code) = match err {
        AppError::NoSession => (StatusCode::CONFLICT, ErrorCode::NoSession),
        AppError::Classifier(ClassifierError::SensorUnavailable) => {
            (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::SensorUnavailable)
        }
        AppError::Classifier(ClassifierError::Sensor(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::SensorError)
        }
        AppError::Scheduler(_) => (StatusCode::BAD_GATEWAY, ErrorCode::StreamRestartFailed),
        AppError::ConfigurationRejected(_) => {
            (StatusCode::BAD_REQUEST, ErrorCode::ConfigurationRejected)
        }
        AppError::StateLock => return internal_error("state lock poisoned", now),
    };
    warn!(error = %err, "Request failed");
    match format_timestamp(now) {
        Ok(timestamp) => ApiResponse::Error {
            status,
            body: ErrorResponse {
                error_code,
                error_message: err.to_string(),
                timestamp,
            },
        },
        Err(_) => internal_error("timestamp formatting failure", now),
    }
}

fn internal_error<T>(message: &str, now: SystemTime) -> ApiResponse<T> {
    error!(message = message, "Internal error while handling request");
    let formatted = format_timestamp(now).unwrap_or_else(|err| {
        error!(error = %err, "Failed to format internal error timestamp");
        OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    });
    ApiResponse::Error {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorResponse {
            error_code: ErrorCode::InternalError,
            error_message: INTERNAL_ERROR_MESSAGE.to_string(),
            timestamp: formatted,
        },
    }
}

fn format_timestamp(timestamp: SystemTime) -> Result<String, TimestampError> {
    let datetime = OffsetDateTime::from(timestamp);
    Ok(datetime.format(&Rfc3339)?)
}
