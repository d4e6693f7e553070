use crate::error::LocationError;
use crate::location::LocationStream;
use crate::scheduler::PollingPolicy;
use std::sync::Arc;
use tokio::sync::watch;

pub type LocationRequestSender = Arc<watch::Sender<Option<PollingPolicy>>>;

/// Publishes the requested polling policy on a watch channel for the host's
/// location provider to follow. `None` means updates are stopped.
#[derive(Debug, Clone)]
pub struct WatchLocationStream {
    tx: LocationRequestSender,
}

impl WatchLocationStream {
    pub fn new(tx: LocationRequestSender) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, watch::Receiver<Option<PollingPolicy>>) {
        let (tx, rx) = watch::channel(None);
        (Self::new(Arc::new(tx)), rx)
    }
}

impl LocationStream for WatchLocationStream {
    fn start(&mut self, policy: PollingPolicy) -> Result<(), LocationError> {
        if self.tx.is_closed() {
            return Err(LocationError::Unavailable(
                "no location provider is subscribed".to_string(),
            ));
        }
        self.tx.send_replace(Some(policy));
        Ok(())
    }

    fn stop(&mut self) {
        self.tx.send_replace(None);
    }
}
