//! Millisecond timeline for scheduled trial callbacks.
//!
//! The timeline itself is virtual: it only orders events by due time and
//! hands back the ones whose time has come. Callers decide what "now" is,
//! either a test stepping through milliseconds or [`SessionClock`] backed
//! by the tokio timer.

use std::time::Duration;

use tokio::time::Instant;

pub type Millis = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled<E> {
    pub due_ms: Millis,
    seq: u64,
    pub event: E,
}

#[derive(Debug, Clone)]
pub struct Timeline<E> {
    pending: Vec<Scheduled<E>>,
    next_seq: u64,
}

impl<E> Default for Timeline<E> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<E: Copy> Timeline<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: Millis, event: E) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.pending.push(Scheduled { due_ms, seq, event });
    }

    pub fn next_due(&self) -> Option<Millis> {
        self.pending.iter().map(|entry| entry.due_ms).min()
    }

    /// Earliest entry due at or before `now_ms`; ties keep scheduling order.
    pub fn pop_due(&mut self, now_ms: Millis) -> Option<Scheduled<E>> {
        let (position, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due_ms <= now_ms)
            .min_by_key(|(_, entry)| (entry.due_ms, entry.seq))?;
        Some(self.pending.remove(position))
    }

    /// Drops every pending entry; returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Wall clock for a running session, anchored at session start.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }

    pub async fn sleep_until(&self, due_ms: Millis) {
        tokio::time::sleep_until(self.origin + Duration::from_millis(due_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_due_order_then_insertion_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(2500, 'c');
        timeline.schedule(500, 'a');
        timeline.schedule(500, 'b');

        assert_eq!(timeline.next_due(), Some(500));
        assert!(timeline.pop_due(499).is_none());
        assert_eq!(timeline.pop_due(3000).map(|e| e.event), Some('a'));
        assert_eq!(timeline.pop_due(3000).map(|e| e.event), Some('b'));
        assert_eq!(timeline.pop_due(3000).map(|e| e.event), Some('c'));
        assert!(timeline.is_empty());
    }

    #[test]
    fn cancel_all_clears_pending() {
        let mut timeline = Timeline::new();
        timeline.schedule(10, 1u8);
        timeline.schedule(20, 2u8);
        assert_eq!(timeline.cancel_all(), 2);
        assert_eq!(timeline.next_due(), None);
        assert!(timeline.pop_due(u64::MAX).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn session_clock_follows_paused_time() {
        let clock = SessionClock::start();
        clock.sleep_until(2500).await;
        assert_eq!(clock.now_ms(), 2500);
    }
}
