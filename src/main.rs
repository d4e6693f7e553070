use geo_activity::api::{self, ApiContext};
use geo_activity::config;
use geo_activity::controller::{SessionController, SessionFactory};
use geo_activity::location::LocationStream;
use geo_activity::location::watch::{LocationRequestSender, WatchLocationStream};
use geo_activity::sampler;
use geo_activity::sensor::iio::{DEFAULT_IIO_ROOT, IioAccelerometer};
use geo_activity::sensor::{NoAccelerometer, SampleSource};
use geo_activity::state::{AppState, StateEventSink};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const IDLE_POLL: Duration = Duration::from_millis(500);

/// Builds device-backed collaborators: the IIO accelerometer and the
/// watch-channel location request.
struct DeviceFactory {
    iio_device: Option<PathBuf>,
    location_tx: LocationRequestSender,
}

impl SessionFactory for DeviceFactory {
    fn sample_source(&self) -> Box<dyn SampleSource> {
        let source = match &self.iio_device {
            Some(path) => Some(IioAccelerometer::new(path)),
            None => IioAccelerometer::discover(DEFAULT_IIO_ROOT),
        };
        match source {
            Some(source) => Box::new(source),
            None => Box::new(NoAccelerometer),
        }
    }

    fn location_stream(&self) -> Box<dyn LocationStream> {
        Box::new(WatchLocationStream::new(Arc::clone(&self.location_tx)))
    }
}

fn init_tracing(level: tracing::Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    init_tracing(config.log_level().unwrap_or(tracing::Level::INFO));
    tracing::info!(
        config_path = config::DEFAULT_CONFIG_PATH,
        app = %config.app.name,
        "geo-activity starting"
    );
    let policy = config.policy_config()?;

    let state = Arc::new(RwLock::new(AppState::new()));
    let (events_tx, _events_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let sink = Arc::new(StateEventSink::new(Arc::clone(&state), events_tx));

    let (location_tx, location_rx) = watch::channel(None);
    let factory = DeviceFactory {
        iio_device: config.iio_device().map(PathBuf::from),
        location_tx: Arc::new(location_tx),
    };
    let capabilities = factory.capabilities();
    tracing::info!(
        accelerometer = capabilities.accelerometer,
        gyroscope = capabilities.gyroscope,
        "Sensor capabilities"
    );

    let controller = Arc::new(SessionController::new(Box::new(factory), sink, policy));
    match controller.start() {
        Ok(snapshot) => tracing::info!(phase = ?snapshot.phase, "Detection session started"),
        Err(err) => tracing::warn!(error = %err, "Detection session not started"),
    }

    let stop_flag = Arc::new(AtomicBool::new(false));
    let _sampler_handle =
        sampler::spawn_sampling_thread(Arc::clone(&controller), Arc::clone(&stop_flag), IDLE_POLL);

    let app = api::router(ApiContext {
        state,
        controller: Arc::clone(&controller),
        location_request: location_rx,
    });
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    stop_flag.store(true, Ordering::Relaxed);
    controller.stop()?;

    Ok(())
}
