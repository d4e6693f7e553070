use crate::error::SensorError;
use crate::sensor::{Sample, SampleSource};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Calls observed by a [`MockSampleSource`], shared with the test that built it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MockSourceLog {
    pub starts: Vec<Duration>,
    pub stops: usize,
}

pub struct MockSampleSource {
    available: bool,
    fail_reads: bool,
    samples: VecDeque<Sample>,
    fallback: Sample,
    failing_starts: Vec<usize>,
    start_attempts: usize,
    armed: bool,
    log: Arc<Mutex<MockSourceLog>>,
}

impl MockSampleSource {
    /// Source that replays `samples` in order, then repeats the fallback sample.
    pub fn new(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            available: true,
            fail_reads: false,
            samples: samples.into_iter().collect(),
            fallback: Sample::default(),
            failing_starts: Vec::new(),
            start_attempts: 0,
            armed: false,
            log: Arc::new(Mutex::new(MockSourceLog::default())),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new([])
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::new([])
        }
    }

    pub fn with_fallback(mut self, sample: Sample) -> Self {
        self.fallback = sample;
        self
    }

    /// Make the `attempt`-th call to `start` (1-based) fail.
    pub fn fail_start(mut self, attempt: usize) -> Self {
        self.failing_starts.push(attempt);
        self
    }

    pub fn log(&self) -> Arc<Mutex<MockSourceLog>> {
        Arc::clone(&self.log)
    }
}

impl SampleSource for MockSampleSource {
    fn has_accelerometer(&self) -> bool {
        self.available
    }

    fn start(&mut self, period: Duration) -> Result<(), SensorError> {
        if !self.available {
            return Err(SensorError::Unavailable);
        }
        self.start_attempts += 1;
        if self.failing_starts.contains(&self.start_attempts) {
            self.armed = false;
            return Err(SensorError::Read("mock start failed".to_string()));
        }
        self.armed = true;
        if let Ok(mut log) = self.log.lock() {
            log.starts.push(period);
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.armed = false;
        if let Ok(mut log) = self.log.lock() {
            log.stops += 1;
        }
    }

    fn read_sample(&mut self) -> Result<Sample, SensorError> {
        if !self.armed {
            return Err(SensorError::NotArmed);
        }
        if self.fail_reads {
            return Err(SensorError::Read("mock read failed".to_string()));
        }
        Ok(self.samples.pop_front().unwrap_or(self.fallback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_script_then_fallback() {
        let mut source = MockSampleSource::new([Sample::new(1.0, 2.0, 3.0)])
            .with_fallback(Sample::new(0.0, 0.0, 9.81));
        source.start(Duration::from_millis(100)).expect("start ok");

        assert_eq!(source.read_sample().expect("first"), Sample::new(1.0, 2.0, 3.0));
        assert_eq!(source.read_sample().expect("second"), Sample::new(0.0, 0.0, 9.81));
    }

    #[test]
    fn read_requires_armed_source() {
        let mut source = MockSampleSource::new([]);

        let err = source.read_sample().unwrap_err();

        assert_eq!(err.to_string(), "sample source not armed");
    }

    #[test]
    fn scheduled_start_failure_disarms_source() {
        let mut source = MockSampleSource::new([]).fail_start(2);

        source.start(Duration::from_millis(100)).expect("first start ok");
        assert!(source.start(Duration::from_millis(250)).is_err());

        assert!(matches!(source.read_sample(), Err(SensorError::NotArmed)));
        source.start(Duration::from_millis(100)).expect("third start ok");
        assert!(source.read_sample().is_ok());
    }

    #[test]
    fn log_records_start_and_stop() {
        let mut source = MockSampleSource::new([]);
        let log = source.log();

        source.start(Duration::from_millis(100)).expect("start ok");
        source.stop();
        source.start(Duration::from_millis(200)).expect("restart ok");

        let log = log.lock().expect("log lock");
        assert_eq!(
            log.starts,
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
        assert_eq!(log.stops, 1);
    }
}
