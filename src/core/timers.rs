use std::{collections::BTreeMap, time::Instant};

use crate::signaling::PeerId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// Deferred `make_offer` after a roster diff.
    StaggeredOffer { peer_id: PeerId },
    /// Grace period after the connection went down.
    GraceTeardown {
        peer_id: PeerId,
        conn_id: u64,
        due: Instant,
    },
    NegotiationTimeout { peer_id: PeerId, conn_id: u64 },
    Reconnect { attempt: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Timer {
    /// Session epoch the timer was armed in.
    pub epoch: u64,
    pub kind: TimerKind,
}

/// Deadline-ordered one-shot timers, fired from the engine's poll.
#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    timers: BTreeMap<(Instant, u64), Timer>,
    seq: u64,
}

impl TimerQueue {
    pub fn schedule(&mut self, at: Instant, timer: Timer) {
        self.seq += 1;
        self.timers.insert((at, self.seq), timer);
    }

    /// Removes and returns the earliest timer due at `now`, if any.
    /// Ties fire in scheduling order.
    pub fn pop_due(&mut self, now: Instant) -> Option<Timer> {
        let entry = self.timers.first_entry()?;
        if entry.key().0 > now {
            return None;
        }
        Some(entry.remove())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.keys().next().map(|(at, _)| *at)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::time::Duration;

    fn offer(peer: &str) -> Timer {
        Timer {
            epoch: 1,
            kind: TimerKind::StaggeredOffer {
                peer_id: peer.into(),
            },
        }
    }

    #[test]
    fn fires_in_deadline_then_insertion_order() {
        let t0 = Instant::now();
        let mut q = TimerQueue::default();
        q.schedule(t0 + Duration::from_millis(20), offer("late"));
        q.schedule(t0 + Duration::from_millis(10), offer("a"));
        q.schedule(t0 + Duration::from_millis(10), offer("b"));

        assert_eq!(q.next_deadline(), Some(t0 + Duration::from_millis(10)));
        assert!(q.pop_due(t0).is_none());

        let now = t0 + Duration::from_millis(15);
        assert_eq!(q.pop_due(now), Some(offer("a")));
        assert_eq!(q.pop_due(now), Some(offer("b")));
        assert!(q.pop_due(now).is_none());
        assert_eq!(q.len(), 1);

        q.clear();
        assert_eq!(q.next_deadline(), None);
    }
}
