//! Clocks and one-shot timers.
//!
//! The controller never sleeps itself: it asks a [`Scheduler`] to deliver a
//! [`Timer`] later and reads the time from a [`Clock`]. In production both are
//! backed by tokio; tests drive a [`VirtualClock`] by hand.

use crate::controller::PlayerMessage;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Something the controller asked to be woken up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    /// Poll the live endpoint for a new mount point
    StreamCheck,
    /// Refresh title and episode link
    MetadataRefresh,
    /// Restart playback after a failure
    Retry { generation: u64 },
    /// Start another hand-off candidate
    HandoffRetry { generation: u64 },
}

/// Opaque handle of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerKey(u64);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub trait Scheduler: Send {
    /// Deliver `timer` once `delay` has elapsed.
    fn schedule(&mut self, timer: Timer, delay: Duration) -> TimerKey;

    /// Forget a timer. Cancelling a timer that already fired is a no-op.
    fn cancel(&mut self, key: TimerKey);

    /// Forget every pending timer.
    fn cancel_all(&mut self);
}

/// Monotonic clock following tokio's time source, so paused-time tests see
/// the same instants as the scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Scheduler spawning one sleeping task per timer; fired timers are posted
/// to the player mailbox.
#[derive(Debug)]
pub struct TokioScheduler {
    mailbox: mpsc::UnboundedSender<PlayerMessage>,
    tasks: HashMap<TimerKey, JoinHandle<()>>,
    next_key: u64,
}

impl TokioScheduler {
    pub fn new(mailbox: mpsc::UnboundedSender<PlayerMessage>) -> Self {
        Self {
            mailbox,
            tasks: HashMap::new(),
            next_key: 0,
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, timer: Timer, delay: Duration) -> TimerKey {
        self.tasks.retain(|_, task| !task.is_finished());

        let key = TimerKey(self.next_key);
        self.next_key += 1;

        let mailbox = self.mailbox.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // the player may already be gone
            let _ = mailbox.send(PlayerMessage::Timer(timer));
        });
        self.tasks.insert(key, task);
        key
    }

    fn cancel(&mut self, key: TimerKey) {
        if let Some(task) = self.tasks.remove(&key) {
            task.abort();
        }
    }

    fn cancel_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[derive(Debug)]
struct VirtualState {
    origin: Instant,
    elapsed: Duration,
    next_key: u64,
    timers: BTreeMap<(Duration, TimerKey), Timer>,
}

/// Hand-driven clock and scheduler.
///
/// Clones share the same timeline, so a test can keep one clone while the
/// controller owns another.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    state: Arc<Mutex<VirtualState>>,
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(VirtualState {
                origin: Instant::now(),
                elapsed: Duration::ZERO,
                next_key: 0,
                timers: BTreeMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VirtualState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// Number of timers waiting to fire.
    pub fn pending(&self) -> usize {
        self.lock().timers.len()
    }

    /// Pending timers, earliest first.
    pub fn pending_timers(&self) -> Vec<Timer> {
        self.lock().timers.values().copied().collect()
    }

    /// Pops the earliest timer due at or before `deadline` (measured from the
    /// clock origin), moving the clock to its due time.
    pub fn pop_due(&self, deadline: Duration) -> Option<Timer> {
        let mut state = self.lock();
        let (&(due, key), _) = state.timers.iter().next()?;
        if due > deadline {
            return None;
        }
        let timer = state.timers.remove(&(due, key))?;
        state.elapsed = state.elapsed.max(due);
        Some(timer)
    }

    /// Moves the clock forward without firing anything.
    pub fn set_elapsed(&self, elapsed: Duration) {
        let mut state = self.lock();
        state.elapsed = state.elapsed.max(elapsed);
    }

    /// Moves the clock forward by `by` and returns every timer that came due,
    /// in due order. Timers scheduled while handling them are not included.
    pub fn advance(&self, by: Duration) -> Vec<Timer> {
        let deadline = self.elapsed() + by;
        let mut fired = Vec::new();
        while let Some(timer) = self.pop_due(deadline) {
            fired.push(timer);
        }
        self.set_elapsed(deadline);
        fired
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        let state = self.lock();
        state.origin + state.elapsed
    }
}

impl Scheduler for VirtualClock {
    fn schedule(&mut self, timer: Timer, delay: Duration) -> TimerKey {
        let mut state = self.lock();
        let key = TimerKey(state.next_key);
        state.next_key += 1;
        let due = state.elapsed + delay;
        state.timers.insert((due, key), timer);
        key
    }

    fn cancel(&mut self, key: TimerKey) {
        self.lock().timers.retain(|&(_, k), _| k != key);
    }

    fn cancel_all(&mut self) {
        self.lock().timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_timers_fire_in_due_order() {
        let mut clock = VirtualClock::new();
        clock.schedule(Timer::StreamCheck, Duration::from_secs(60));
        clock.schedule(Timer::Retry { generation: 1 }, Duration::from_secs(15));
        clock.schedule(Timer::MetadataRefresh, Duration::from_secs(60));

        assert!(clock.advance(Duration::from_secs(14)).is_empty());
        assert_eq!(
            clock.advance(Duration::from_secs(1)),
            vec![Timer::Retry { generation: 1 }]
        );
        assert_eq!(
            clock.advance(Duration::from_secs(100)),
            vec![Timer::StreamCheck, Timer::MetadataRefresh]
        );
        assert_eq!(clock.elapsed(), Duration::from_secs(115));
    }

    #[test]
    fn test_virtual_cancel() {
        let mut clock = VirtualClock::new();
        let key = clock.schedule(Timer::StreamCheck, Duration::from_secs(1));
        clock.schedule(Timer::MetadataRefresh, Duration::from_secs(1));
        clock.cancel(key);
        assert_eq!(clock.pending(), 1);
        clock.cancel_all();
        assert!(clock.advance(Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn test_virtual_now_follows_elapsed() {
        let clock = VirtualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_secs(299));
        assert_eq!(clock.now() - start, Duration::from_secs(299));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_posts_and_cancels() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);
        scheduler.schedule(Timer::StreamCheck, Duration::from_secs(60));
        let cancelled = scheduler.schedule(Timer::MetadataRefresh, Duration::from_secs(30));
        scheduler.cancel(cancelled);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(matches!(
            rx.try_recv(),
            Ok(PlayerMessage::Timer(Timer::StreamCheck))
        ));
        assert!(rx.try_recv().is_err());
    }
}
