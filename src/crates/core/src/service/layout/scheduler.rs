use std::time::Duration;
use tokio::time::Instant;

/// Delay before fitting the view after a re-layout
pub const RELAYOUT_FIT_DELAY: Duration = Duration::from_millis(0);
/// Delay before fitting the view after the first layout
pub const INITIAL_FIT_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug)]
struct Deferred<A> {
    due: Instant,
    seq: u64,
    action: A,
}

/// Actions postponed until after the next render pass.
///
/// The owner drives it: `schedule` records an action, `drain_due` hands back
/// every action whose time has come, in scheduling order.
#[derive(Debug)]
pub struct DeferredQueue<A> {
    pending: Vec<Deferred<A>>,
    next_seq: u64,
}

impl<A> Default for DeferredQueue<A> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<A> DeferredQueue<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, action: A, delay: Duration, now: Instant) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Deferred {
            due: now + delay,
            seq,
            action,
        });
        seq
    }

    pub fn drain_due(&mut self, now: Instant) -> Vec<A> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|d| d.due <= now);
        self.pending = pending;
        due.sort_by_key(|d| d.seq);
        due.into_iter().map(|d| d.action).collect()
    }

    /// Run every due action through `f`; returns how many ran
    pub fn run_due<F>(&mut self, now: Instant, mut f: F) -> usize
    where
        F: FnMut(A),
    {
        let due = self.drain_due(now);
        let count = due.len();
        due.into_iter().for_each(&mut f);
        count
    }

    /// Earliest pending due time
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(|d| d.due).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_due_actions_in_scheduling_order() {
        let start = Instant::now();
        let mut queue = DeferredQueue::new();
        queue.schedule("initial-fit", INITIAL_FIT_DELAY, start);
        queue.schedule("relayout-fit", RELAYOUT_FIT_DELAY, start);
        queue.schedule("second", RELAYOUT_FIT_DELAY, start);

        assert_eq!(queue.drain_due(start), vec!["relayout-fit", "second"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_due(), Some(start + INITIAL_FIT_DELAY));

        let mut ran = Vec::new();
        let count = queue.run_due(start + Duration::from_millis(100), |a| ran.push(a));
        assert_eq!(count, 1);
        assert_eq!(ran, vec!["initial-fit"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn all_due_actions_run_fifo_even_with_different_delays() {
        let start = Instant::now();
        let mut queue = DeferredQueue::new();
        queue.schedule(1, Duration::from_millis(50), start);
        queue.schedule(2, Duration::from_millis(0), start);

        let later = start + Duration::from_millis(60);
        assert_eq!(queue.drain_due(later), vec![1, 2]);
    }
}
