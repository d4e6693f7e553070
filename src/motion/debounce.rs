use crate::motion::MotionState;

pub const DEFAULT_START_STABILITY: u32 = 20;
pub const DEFAULT_STOP_STABILITY: u32 = 3000;

/// Consecutive-sample counts required before committing a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilityThresholds {
    start: u32,
    stop: u32,
}

impl StabilityThresholds {
    /// Both counts are coerced to at least 1.
    pub fn new(start: u32, stop: u32) -> Self {
        Self {
            start: start.max(1),
            stop: stop.max(1),
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn stop(&self) -> u32 {
        self.stop
    }

    /// Threshold a candidate must reach to be committed.
    pub fn for_candidate(&self, candidate: MotionState) -> u32 {
        match candidate {
            MotionState::Moving => self.start,
            MotionState::Stationary => self.stop,
        }
    }
}

impl Default for StabilityThresholds {
    fn default() -> Self {
        Self::new(DEFAULT_START_STABILITY, DEFAULT_STOP_STABILITY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Debouncer {
    committed: MotionState,
    candidate: MotionState,
    count: u32,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed(&self) -> MotionState {
        self.committed
    }

    pub fn candidate(&self) -> MotionState {
        self.candidate
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Records one raw decision and returns the newly committed state, if any.
    ///
    /// The counter saturates at the candidate's threshold so it stays bounded
    /// while the committed state holds.
    pub fn observe(
        &mut self,
        raw: MotionState,
        thresholds: &StabilityThresholds,
    ) -> Option<MotionState> {
        let required = thresholds.for_candidate(raw);
        if raw == self.candidate {
            self.count = self.count.saturating_add(1).min(required);
        } else {
            self.candidate = raw;
            self.count = 1;
        }

        if self.candidate != self.committed && self.count >= required {
            self.committed = self.candidate;
            return Some(self.committed);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(debouncer: &mut Debouncer, raw: MotionState, n: u32, t: &StabilityThresholds) -> Vec<MotionState> {
        (0..n).filter_map(|_| debouncer.observe(raw, t)).collect()
    }

    #[test]
    fn thresholds_are_clamped_to_one() {
        let thresholds = StabilityThresholds::new(0, 0);

        assert_eq!(thresholds.start(), 1);
        assert_eq!(thresholds.stop(), 1);
    }

    #[test]
    fn one_short_of_start_threshold_does_not_commit() {
        let thresholds = StabilityThresholds::new(5, 10);
        let mut debouncer = Debouncer::new();

        let commits = feed(&mut debouncer, MotionState::Moving, 4, &thresholds);
        assert!(commits.is_empty());

        debouncer.observe(MotionState::Stationary, &thresholds);
        let commits = feed(&mut debouncer, MotionState::Moving, 4, &thresholds);

        assert!(commits.is_empty());
        assert_eq!(debouncer.committed(), MotionState::Stationary);
    }

    #[test]
    fn commits_on_exact_threshold_sample() {
        let thresholds = StabilityThresholds::new(5, 10);
        let mut debouncer = Debouncer::new();

        for _ in 0..4 {
            assert_eq!(debouncer.observe(MotionState::Moving, &thresholds), None);
        }
        assert_eq!(
            debouncer.observe(MotionState::Moving, &thresholds),
            Some(MotionState::Moving)
        );
        assert_eq!(debouncer.observe(MotionState::Moving, &thresholds), None);
    }

    #[test]
    fn stop_threshold_governs_return_to_stationary() {
        let thresholds = StabilityThresholds::new(1, 3);
        let mut debouncer = Debouncer::new();
        assert_eq!(
            debouncer.observe(MotionState::Moving, &thresholds),
            Some(MotionState::Moving)
        );

        assert_eq!(debouncer.observe(MotionState::Stationary, &thresholds), None);
        assert_eq!(debouncer.observe(MotionState::Stationary, &thresholds), None);
        assert_eq!(
            debouncer.observe(MotionState::Stationary, &thresholds),
            Some(MotionState::Stationary)
        );
    }

    #[test]
    fn interruption_restarts_count() {
        let thresholds = StabilityThresholds::new(3, 3);
        let mut debouncer = Debouncer::new();

        feed(&mut debouncer, MotionState::Moving, 2, &thresholds);
        debouncer.observe(MotionState::Stationary, &thresholds);

        assert_eq!(debouncer.candidate(), MotionState::Stationary);
        assert_eq!(debouncer.count(), 1);
        assert!(feed(&mut debouncer, MotionState::Moving, 2, &thresholds).is_empty());
    }

    #[test]
    fn count_stays_bounded_while_committed() {
        let thresholds = StabilityThresholds::new(2, 4);
        let mut debouncer = Debouncer::new();

        let commits = feed(&mut debouncer, MotionState::Stationary, 100, &thresholds);

        assert!(commits.is_empty());
        assert_eq!(debouncer.count(), 4);
    }
}
