// SPDX-FileCopyrightText: 2026 Lumi Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded pool for background work that must not delay an HTTP response.
//!
//! Submissions beyond `max_pending` in-flight tasks are dropped with a
//! warning. At most `max_concurrent` run at once. Outcomes flow into a
//! channel that is consumed only for logging, and [`TaskPool::drain`] waits
//! for in-flight work during shutdown.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lumi_core::LumiError;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Result of one finished background task.
#[derive(Debug)]
pub struct TaskOutcome {
    pub name: &'static str,
    pub result: Result<(), LumiError>,
}

struct PoolInner {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    pending: AtomicUsize,
    max_pending: usize,
    outcomes: mpsc::Sender<TaskOutcome>,
}

/// Cheaply cloneable handle to the shared pool.
#[derive(Clone)]
pub struct TaskPool {
    inner: Arc<PoolInner>,
}

impl TaskPool {
    /// Creates the pool and the receiving end of its outcome channel.
    pub fn new(max_concurrent: usize, max_pending: usize) -> (Self, mpsc::Receiver<TaskOutcome>) {
        let max_pending = max_pending.max(1);
        let (tx, rx) = mpsc::channel(max_pending);
        let pool = Self {
            inner: Arc::new(PoolInner {
                tracker: TaskTracker::new(),
                permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
                pending: AtomicUsize::new(0),
                max_pending,
                outcomes: tx,
            }),
        };
        (pool, rx)
    }

    /// Queues `task`. Returns `false` when the pool is full or draining.
    pub fn submit<F>(&self, name: &'static str, task: F) -> bool
    where
        F: Future<Output = Result<(), LumiError>> + Send + 'static,
    {
        let inner = &self.inner;
        if inner.tracker.is_closed() {
            warn!(task = name, "task pool is draining, dropping task");
            return false;
        }

        let reserved = inner
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < inner.max_pending).then_some(n + 1)
            })
            .is_ok();
        if !reserved {
            warn!(task = name, max_pending = inner.max_pending, "task pool full, dropping task");
            return false;
        }

        let pool = Arc::clone(inner);
        inner.tracker.spawn(async move {
            let result = match Arc::clone(&pool.permits).acquire_owned().await {
                Ok(_permit) => task.await,
                Err(_) => Err(LumiError::Cancelled),
            };
            pool.pending.fetch_sub(1, Ordering::AcqRel);
            if pool.outcomes.try_send(TaskOutcome { name, result }).is_err() {
                debug!(task = name, "outcome channel unavailable");
            }
        });
        true
    }

    /// Tasks submitted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Stops accepting work and waits up to `timeout` for in-flight tasks.
    ///
    /// Returns `true` when everything finished in time. Tasks still running
    /// afterwards are abandoned.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.inner.tracker.close();
        let remaining = self.in_flight();
        if remaining == 0 {
            info!("no background tasks to drain");
            return true;
        }
        info!(count = remaining, "waiting for background tasks to complete");
        match tokio::time::timeout(timeout, self.inner.tracker.wait()).await {
            Ok(()) => {
                info!("all background tasks drained");
                true
            }
            Err(_) => {
                warn!(remaining = self.in_flight(), "drain timeout reached, abandoning tasks");
                false
            }
        }
    }
}

/// Spawns the consumer that logs every task outcome.
pub fn spawn_outcome_logger(mut outcomes: mpsc::Receiver<TaskOutcome>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(outcome) = outcomes.recv().await {
            match outcome.result {
                Ok(()) => debug!(task = outcome.name, "background task finished"),
                Err(e) => warn!(task = outcome.name, error = %e, "background task failed"),
            }
        }
    })
}
