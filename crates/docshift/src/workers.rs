//! Bounded pool for blocking conversion work.
//!
//! Conversions (pdfium, LibreOffice, yt-dlp, zip writing) are CPU- or
//! subprocess-bound and run on tokio's blocking threads. A semaphore caps how
//! many run at once, and an admission counter caps how many may wait; jobs
//! beyond both limits are rejected with [`DocshiftError::Overloaded`] instead
//! of piling up.

use crate::core::WorkerConfig;
use crate::{DocshiftError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    admitted: Arc<AtomicUsize>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(max_concurrent: usize, max_queued: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            admitted: Arc::new(AtomicUsize::new(0)),
            capacity: max_concurrent + max_queued,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.max_concurrent, config.max_queued)
    }

    /// Jobs running or waiting for a slot.
    pub fn in_flight(&self) -> usize {
        self.admitted.load(Ordering::Acquire)
    }

    /// Run a blocking job once a slot is free.
    ///
    /// # Errors
    ///
    /// `Overloaded` when the pool is saturated, the job's own error otherwise.
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let admission = Admission::try_new(&self.admitted, self.capacity)?;

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| DocshiftError::Other("Worker pool closed".to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _admission = admission;
            job()
        })
        .await
        .map_err(|e| DocshiftError::Other(format!("Conversion task panicked: {}", e)))?
    }
}

/// Counts a job against the pool's capacity until dropped.
struct Admission {
    admitted: Arc<AtomicUsize>,
}

impl Admission {
    fn try_new(admitted: &Arc<AtomicUsize>, capacity: usize) -> Result<Self> {
        let mut current = admitted.load(Ordering::Acquire);
        loop {
            if current >= capacity {
                return Err(DocshiftError::Overloaded(format!(
                    "{} conversions already admitted",
                    current
                )));
            }
            match admitted.compare_exchange_weak(current, current + 1, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => {
                    return Ok(Self {
                        admitted: Arc::clone(admitted),
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.admitted.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_job_result() {
        let pool = WorkerPool::new(2, 2);
        let value = pool.run(|| Ok(21 * 2)).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_run_propagates_job_error() {
        let pool = WorkerPool::new(1, 0);
        let err = pool
            .run(|| -> Result<()> { Err(DocshiftError::conversion("No pages found in PDF.")) })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No pages found in PDF.");
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panicking_job_is_reported() {
        let pool = WorkerPool::new(1, 0);
        let err = pool.run(|| -> Result<()> { panic!("boom") }).await.unwrap_err();
        assert!(err.to_string().contains("panicked"));
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_saturated_pool_rejects() {
        let pool = WorkerPool::new(1, 0);
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let busy = pool.clone();
        let running = tokio::spawn(async move {
            busy.run(move || {
                let _ = started_tx.send(());
                let _ = release_rx.recv_timeout(Duration::from_secs(5));
                Ok(())
            })
            .await
        });

        started_rx.await.unwrap();
        let err = pool.run(|| Ok(())).await.unwrap_err();
        assert!(matches!(err, DocshiftError::Overloaded(_)));

        release_tx.send(()).unwrap();
        running.await.unwrap().unwrap();
        assert_eq!(pool.in_flight(), 0);
        pool.run(|| Ok(())).await.unwrap();
    }

    #[test]
    fn test_from_config() {
        let pool = WorkerPool::from_config(&WorkerConfig {
            max_concurrent: 3,
            max_queued: 5,
        });
        assert_eq!(pool.capacity, 8);
    }
}
