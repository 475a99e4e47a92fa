//! Background fetches.
//!
//! Network round trips never run on the controller's own task. The
//! controller hands a [`FetchJob`] to a [`Fetcher`] and moves on to the next
//! message; the job's outcome comes back later through the mailbox as a
//! [`PlayerMessage`], tagged so the controller can tell a stale answer from
//! a current one. In production jobs run on spawned tokio tasks; tests queue
//! them in a [`ManualFetcher`] and run them by hand.

use crate::controller::PlayerMessage;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A fetch resolving to the message that reports its outcome.
pub type FetchJob = BoxFuture<'static, PlayerMessage>;

pub trait Fetcher: Send {
    /// Runs `job` in the background.
    fn spawn(&mut self, job: FetchJob);

    /// Abandons every job in flight. Their outcomes are never delivered.
    fn cancel_all(&mut self);
}

/// Fetcher running each job on its own task and posting the outcome to the
/// player mailbox.
#[derive(Debug)]
pub struct TokioFetcher {
    mailbox: mpsc::UnboundedSender<PlayerMessage>,
    tasks: Vec<JoinHandle<()>>,
}

impl TokioFetcher {
    pub fn new(mailbox: mpsc::UnboundedSender<PlayerMessage>) -> Self {
        Self {
            mailbox,
            tasks: Vec::new(),
        }
    }

    /// Jobs still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_finished()).count()
    }
}

impl Fetcher for TokioFetcher {
    fn spawn(&mut self, job: FetchJob) {
        self.tasks.retain(|task| !task.is_finished());

        let mailbox = self.mailbox.clone();
        self.tasks.push(tokio::spawn(async move {
            let message = job.await;
            // the player may already be gone
            let _ = mailbox.send(message);
        }));
    }

    fn cancel_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for TokioFetcher {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Fetcher keeping jobs in a queue until they are run explicitly.
///
/// Clones share the same queue.
#[derive(Clone, Default)]
pub struct ManualFetcher {
    jobs: Arc<Mutex<VecDeque<FetchJob>>>,
}

impl ManualFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<FetchJob>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of queued jobs.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Runs the oldest queued job to completion and returns its outcome.
    pub async fn run_next(&self) -> Option<PlayerMessage> {
        let job = self.lock().pop_front()?;
        Some(job.await)
    }
}

impl fmt::Debug for ManualFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualFetcher")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Fetcher for ManualFetcher {
    fn spawn(&mut self, job: FetchJob) {
        self.lock().push_back(job);
    }

    fn cancel_all(&mut self) {
        self.lock().clear();
    }
}
