//! Dedicated thread that drives the running session at its sampling period.

use crate::controller::SessionController;
use crate::error::AppError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SLEEP_STEP: Duration = Duration::from_millis(10);

/// Run one sampling tick. Returns how long to wait before the next one.
pub fn run_sampling_cycle(controller: &SessionController, idle_poll: Duration) -> Duration {
    match controller.tick() {
        Ok(Some(state)) => debug!(state = state.as_str(), "Transition handled"),
        Ok(None) => {}
        Err(AppError::NoSession) => return idle_poll,
        Err(err) => warn!(error = %err, "Sampling tick failed"),
    }
    controller.sampling_period().unwrap_or(idle_poll)
}

pub fn spawn_sampling_thread(
    controller: Arc<SessionController>,
    stop: Arc<AtomicBool>,
    idle_poll: Duration,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            let cycle_start = Instant::now();
            let period = run_sampling_cycle(&controller, idle_poll);
            sleep_with_stop(period, &stop, cycle_start);
        }
    })
}

fn sleep_with_stop(duration: Duration, stop: &AtomicBool, start: Instant) {
    let elapsed = start.elapsed();
    if elapsed >= duration {
        return;
    }
    let remaining = duration - elapsed;
    let mut slept = Duration::ZERO;

    while slept < remaining {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let step = SLEEP_STEP.min(remaining - slept);
        std::thread::sleep(step);
        slept += step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::{MockFactory, controller, controller_with};

    #[test]
    fn idle_cycle_waits_idle_poll() {
        let (controller, _stream) = controller(true);

        let wait = run_sampling_cycle(&controller, Duration::from_millis(500));

        assert_eq!(wait, Duration::from_millis(500));
    }

    #[test]
    fn running_cycle_waits_sampling_period() -> Result<(), AppError> {
        let (controller, _stream) = controller(true);
        controller.set_sampling_period(Duration::from_millis(200))?;
        controller.start()?;

        let wait = run_sampling_cycle(&controller, Duration::from_millis(500));

        assert_eq!(wait, Duration::from_millis(200));
        Ok(())
    }

    #[test]
    fn read_failures_are_skipped_at_sampling_period() -> Result<(), AppError> {
        let (controller, _stream) = controller_with(MockFactory {
            available: true,
            failing_reads: true,
            ..MockFactory::default()
        });
        controller.set_sampling_period(Duration::from_millis(150))?;
        controller.start()?;

        for _ in 0..3 {
            let wait = run_sampling_cycle(&controller, Duration::from_millis(500));
            assert_eq!(wait, Duration::from_millis(150));
        }

        assert!(controller.is_running()?);
        Ok(())
    }

    #[test]
    fn thread_exits_when_stopped() {
        let (controller, _stream) = controller(true);
        let stop = Arc::new(AtomicBool::new(false));
        let handle = spawn_sampling_thread(
            Arc::new(controller),
            Arc::clone(&stop),
            Duration::from_millis(20),
        );

        stop.store(true, Ordering::Relaxed);

        assert!(handle.join().is_ok());
    }
}
