use crate::error::LocationError;
use crate::location::LocationStream;
use crate::scheduler::PollingPolicy;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCall {
    Start(PollingPolicy),
    Stop,
}

#[derive(Debug, Default)]
struct MockStreamLog {
    calls: Vec<StreamCall>,
    failures: VecDeque<LocationError>,
    running: Option<PollingPolicy>,
}

/// Recording location stream. Clones share the same log, so a test can keep
/// one handle while the scheduler owns another.
#[derive(Debug, Clone, Default)]
pub struct MockLocationStream {
    log: Arc<Mutex<MockStreamLog>>,
}

impl MockLocationStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `start` fail with `err`.
    pub fn fail_next(&self, err: LocationError) {
        if let Ok(mut log) = self.log.lock() {
            log.failures.push_back(err);
        }
    }

    pub fn calls(&self) -> Vec<StreamCall> {
        self.log
            .lock()
            .map(|log| log.calls.clone())
            .unwrap_or_default()
    }

    /// Policies passed to successful `start` calls, in order.
    pub fn starts(&self) -> Vec<PollingPolicy> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StreamCall::Start(policy) => Some(policy),
                StreamCall::Stop => None,
            })
            .collect()
    }

    pub fn running(&self) -> Option<PollingPolicy> {
        self.log.lock().ok().and_then(|log| log.running)
    }
}

impl LocationStream for MockLocationStream {
    fn start(&mut self, policy: PollingPolicy) -> Result<(), LocationError> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| LocationError::Unavailable("mock log poisoned".to_string()))?;
        if let Some(err) = log.failures.pop_front() {
            return Err(err);
        }
        log.calls.push(StreamCall::Start(policy));
        log.running = Some(policy);
        Ok(())
    }

    fn stop(&mut self) {
        if let Ok(mut log) = self.log.lock()
            && log.running.take().is_some()
        {
            log.calls.push(StreamCall::Stop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Priority;
    use std::time::Duration;

    #[test]
    fn stop_is_idempotent() {
        let mut stream = MockLocationStream::new();
        let policy = PollingPolicy::new(Priority::BalancedPower, Duration::from_secs(180));

        stream.stop();
        stream.start(policy).expect("start ok");
        stream.stop();
        stream.stop();

        assert_eq!(stream.calls(), vec![StreamCall::Start(policy), StreamCall::Stop]);
    }

    #[test]
    fn injected_failure_is_consumed_once() {
        let mut stream = MockLocationStream::new();
        let policy = PollingPolicy::new(Priority::HighAccuracy, Duration::from_secs(30));
        stream.fail_next(LocationError::PermissionDenied);

        assert_eq!(stream.start(policy), Err(LocationError::PermissionDenied));
        assert_eq!(stream.start(policy), Ok(()));
        assert_eq!(stream.running(), Some(policy));
    }
}
