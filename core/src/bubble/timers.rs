//! Single-threaded timer queue for bubble animations
//!
//! Timers are plain data: the owner pops whichever are due and dispatches on
//! their kind. Every timer carries the session generation it was scheduled
//! under so a superseded session's timers can be recognized and ignored.

use std::time::{Duration, Instant};

/// Handle for a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Poll the anchor rectangle
    Track,
    /// Advance a fade-in or fade-out step
    Fade,
    /// Reveal the next characters
    Type,
    /// Auto-hide deadline
    Deadline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub id: TimerId,
    pub kind: TimerKind,
    pub due: Instant,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    pending: Vec<Timer>,
    next_id: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a one-shot timer. Recurring behaviour is the owner's job:
    /// it reschedules from inside the handler.
    pub fn schedule(&mut self, kind: TimerKind, due: Instant, generation: u64) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Timer {
            id,
            kind,
            due,
            generation,
        });
        id
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.id != id);
        self.pending.len() != before
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Remove and return the earliest timer due at or before `now`.
    ///
    /// Ties on `due` resolve in scheduling order.
    pub fn pop_due(&mut self, now: Instant) -> Option<Timer> {
        let (idx, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(_, t)| (t.due, t.id))?;
        Some(self.pending.swap_remove(idx))
    }

    /// When the next timer becomes due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|t| t.due).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.pending.iter().any(|t| t.id == id)
    }
}

/// Next due time for a recurring timer that should not replay missed ticks
pub fn next_without_catch_up(due: Instant, interval: Duration, now: Instant) -> Instant {
    let next = due + interval;
    if next <= now { now + interval } else { next }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn pops_in_due_then_schedule_order() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        let late = queue.schedule(TimerKind::Deadline, t0 + ms(30), 1);
        let first = queue.schedule(TimerKind::Track, t0 + ms(10), 1);
        let second = queue.schedule(TimerKind::Type, t0 + ms(10), 1);

        assert_eq!(queue.pop_due(t0 + ms(5)), None);
        assert_eq!(queue.pop_due(t0 + ms(50)).map(|t| t.id), Some(first));
        assert_eq!(queue.pop_due(t0 + ms(50)).map(|t| t.id), Some(second));
        assert_eq!(queue.pop_due(t0 + ms(50)).map(|t| t.id), Some(late));
        assert!(queue.is_empty());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        let id = queue.schedule(TimerKind::Fade, t0, 3);

        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert_eq!(queue.pop_due(t0 + ms(100)), None);
    }

    #[test]
    fn timers_remember_their_generation() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::Type, t0, 7);

        let timer = queue.pop_due(t0).unwrap();
        assert_eq!(timer.generation, 7);
        assert_eq!(timer.kind, TimerKind::Type);
    }

    #[test]
    fn next_deadline_is_the_minimum() {
        let t0 = Instant::now();
        let mut queue = TimerQueue::new();
        assert_eq!(queue.next_deadline(), None);

        queue.schedule(TimerKind::Track, t0 + ms(50), 1);
        queue.schedule(TimerKind::Fade, t0 + ms(20), 1);
        assert_eq!(queue.next_deadline(), Some(t0 + ms(20)));
    }

    #[test]
    fn missed_ticks_are_skipped() {
        let t0 = Instant::now();
        assert_eq!(next_without_catch_up(t0, ms(50), t0 + ms(10)), t0 + ms(50));
        assert_eq!(next_without_catch_up(t0, ms(50), t0 + ms(170)), t0 + ms(220));
    }
}
