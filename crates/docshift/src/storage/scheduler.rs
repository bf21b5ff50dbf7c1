//! Deferred artifact deletion.
//!
//! A single background task owns a [`DelayQueue`] of pending removals. Request
//! handlers enqueue through a bounded channel without ever waiting: when the
//! channel is full, [`DeletionScheduler::schedule`] fails immediately and the
//! caller decides what to do.

use super::artifact::Artifact;
use super::cleanup::{BestEffort, remove_path_async};
use crate::{DocshiftError, Result};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::time::DelayQueue;

/// Longest delay the deletion queue accepts (two years).
pub const MAX_DELAY: Duration = Duration::from_secs(2 * 365 * 24 * 60 * 60);

#[derive(Debug)]
struct PendingDeletion {
    path: PathBuf,
    delay: Duration,
}

/// Handle to the deletion task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DeletionScheduler {
    tx: mpsc::Sender<PendingDeletion>,
    pending: Arc<AtomicUsize>,
}

impl DeletionScheduler {
    /// Spawn the deletion task on the current runtime.
    ///
    /// The task runs until every handle is dropped, then removes whatever is
    /// still queued once its delay elapses.
    pub fn start(max_pending: usize) -> Self {
        let (tx, rx) = mpsc::channel(max_pending.max(1));
        let pending = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run(rx, Arc::clone(&pending)));
        Self { tx, pending }
    }

    /// Remove `artifact` after `delay`. Never blocks.
    pub fn schedule(&self, artifact: Artifact, delay: Duration) -> Result<()> {
        self.schedule_path(artifact.into_path(), delay)
    }

    pub fn schedule_path(&self, path: PathBuf, delay: Duration) -> Result<()> {
        if delay > MAX_DELAY {
            return Err(DocshiftError::Scheduling(format!(
                "delay of {}s exceeds the {}s maximum, cannot schedule {}",
                delay.as_secs(),
                MAX_DELAY.as_secs(),
                path.display()
            )));
        }

        // Counted before sending so the task never decrements first.
        self.pending.fetch_add(1, Ordering::Relaxed);
        match self.tx.try_send(PendingDeletion { path, delay }) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.pending.fetch_sub(1, Ordering::Relaxed);
                match err {
                    mpsc::error::TrySendError::Full(job) => Err(DocshiftError::Scheduling(format!(
                        "deletion queue is full, cannot schedule {}",
                        job.path.display()
                    ))),
                    mpsc::error::TrySendError::Closed(job) => Err(DocshiftError::Scheduling(format!(
                        "deletion task has stopped, cannot schedule {}",
                        job.path.display()
                    ))),
                }
            }
        }
    }

    /// Deletions accepted but not yet carried out.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }
}

async fn run(mut rx: mpsc::Receiver<PendingDeletion>, pending: Arc<AtomicUsize>) {
    let mut queue: DelayQueue<PathBuf> = DelayQueue::new();
    let mut open = true;

    loop {
        tokio::select! {
            job = rx.recv(), if open => match job {
                Some(job) => {
                    tracing::debug!("Deleting {} in {:?}", job.path.display(), job.delay);
                    queue.insert(job.path, job.delay);
                }
                None => open = false,
            },
            Some(expired) = queue.next(), if !queue.is_empty() => {
                let path = expired.into_inner();
                remove_path_async(&path).await.best_effort();
                pending.fetch_sub(1, Ordering::Relaxed);
            }
            else => break,
        }
    }

    tracing::debug!("Deletion task stopped");
}
