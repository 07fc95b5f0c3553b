//! Logical debounce timers.
//!
//! At most one pending deadline per [`TimerKind`]. Re-arming replaces the
//! deadline, which is what coalesces bursts. Time is plain milliseconds
//! supplied by the caller, so tests advance it by hand.

use std::collections::BTreeMap;

/// Logical time in milliseconds since the engine started.
pub type Millis = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    /// Fires the reset fetch after the last search-box keystroke.
    SearchDebounce,
    /// Writes the session after the last mutation.
    PersistDebounce,
}

#[derive(Debug, Clone, Default)]
pub struct Timers {
    pending: BTreeMap<TimerKind, Millis>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind` to fire at `deadline`, replacing any earlier arming.
    pub fn arm(&mut self, kind: TimerKind, deadline: Millis) {
        self.pending.insert(kind, deadline);
    }

    /// Returns true if a pending timer was cancelled.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.pending.remove(&kind).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.pending.contains_key(&kind)
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Millis> {
        self.pending.get(&kind).copied()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.pending.values().min().copied()
    }

    /// Remove and return the earliest timer due at `now`.
    ///
    /// Only one timer fires per call; ties go to the kind declared first.
    pub fn pop_due(&mut self, now: Millis) -> Option<TimerKind> {
        let (kind, _) = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .min_by_key(|(kind, deadline)| (**deadline, **kind))
            .map(|(k, d)| (*k, *d))?;
        self.pending.remove(&kind);
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_due_before_deadline() {
        let mut timers = Timers::new();
        timers.arm(TimerKind::SearchDebounce, 500);

        assert_eq!(timers.pop_due(499), None);
        assert_eq!(timers.pop_due(500), Some(TimerKind::SearchDebounce));
        assert_eq!(timers.pop_due(10_000), None);
    }

    #[test]
    fn test_rearm_pushes_deadline_back() {
        let mut timers = Timers::new();
        timers.arm(TimerKind::SearchDebounce, 500);
        timers.arm(TimerKind::SearchDebounce, 800);

        assert_eq!(timers.next_deadline(), Some(800));
        assert_eq!(timers.pop_due(600), None);
        assert_eq!(timers.pop_due(800), Some(TimerKind::SearchDebounce));
    }

    #[test]
    fn test_one_timer_fires_per_pop() {
        let mut timers = Timers::new();
        timers.arm(TimerKind::PersistDebounce, 300);
        timers.arm(TimerKind::SearchDebounce, 300);

        assert_eq!(timers.pop_due(300), Some(TimerKind::SearchDebounce));
        assert_eq!(timers.pop_due(300), Some(TimerKind::PersistDebounce));
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn test_earliest_deadline_fires_first() {
        let mut timers = Timers::new();
        timers.arm(TimerKind::SearchDebounce, 700);
        timers.arm(TimerKind::PersistDebounce, 200);

        assert_eq!(timers.pop_due(1_000), Some(TimerKind::PersistDebounce));
    }

    #[test]
    fn test_cancel() {
        let mut timers = Timers::new();
        timers.arm(TimerKind::PersistDebounce, 100);

        assert!(timers.cancel(TimerKind::PersistDebounce));
        assert!(!timers.cancel(TimerKind::PersistDebounce));
        assert!(!timers.is_armed(TimerKind::PersistDebounce));
        assert_eq!(timers.pop_due(1_000), None);
    }
}
