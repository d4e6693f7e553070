use crate::controller::SessionController;
use crate::scheduler::PollingPolicy;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post, put};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

pub mod handlers;
pub mod responses;

#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<RwLock<AppState>>,
    pub controller: Arc<SessionController>,
    pub location_request: watch::Receiver<Option<PollingPolicy>>,
}

pub fn router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/api/motion", get(handlers::get_motion))
        .route("/api/health", get(handlers::get_health))
        .route("/api/capabilities", get(handlers::get_capabilities))
        .route(
            "/api/location",
            get(handlers::get_location).post(handlers::post_location),
        )
        .route("/api/location/interval", put(handlers::put_polling_interval))
        .route("/api/session/start", post(handlers::post_session_start))
        .route("/api/session/stop", post(handlers::post_session_stop))
        .route("/api/config", get(handlers::get_config))
        .route("/api/config/thresholds", put(handlers::put_thresholds))
        .route("/api/config/intervals", put(handlers::put_intervals))
        .route("/api/config/sampling", put(handlers::put_sampling))
        .with_state(ctx)
}
