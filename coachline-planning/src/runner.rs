use coachline_core::repository::JobLock;
use coachline_core::{CoreError, CoreResult};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Lock keys for the scheduled jobs
pub mod jobs {
    pub const PRICE_ADJUSTMENT: &str = "price-adjustment";
    pub const CAPACITY_REBALANCE: &str = "capacity-rebalance";
    pub const INVENTORY_CLEANUP: &str = "inventory-cleanup";
}

/// Runs a job only when no other run of it holds the lock
pub struct JobRunner {
    lock: Arc<dyn JobLock>,
    holder: String,
    ttl_seconds: u64,
}

impl JobRunner {
    pub fn new(lock: Arc<dyn JobLock>, ttl_seconds: u64) -> Self {
        Self {
            lock,
            holder: format!("runner-{}", Uuid::new_v4()),
            ttl_seconds,
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Fails fast with `JobInProgress` instead of queueing behind a running job
    pub async fn run_exclusive<T, F, Fut>(&self, job: &str, task: F) -> CoreResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        if !self.lock.try_acquire(job, &self.holder, self.ttl_seconds).await? {
            warn!("Job {} already running elsewhere, skipping", job);
            return Err(CoreError::JobInProgress(job.to_string()));
        }

        info!("Job {} started", job);
        let result = task().await;

        if let Err(e) = self.lock.release(job, &self.holder).await {
            // The TTL frees it eventually
            warn!("Failed to release lock for job {}: {}", job, e);
        }

        match &result {
            Ok(_) => info!("Job {} finished", job),
            Err(e) => error!("Job {} failed: {}", job, e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coachline_store::memory::LocalJobLock;

    #[tokio::test]
    async fn test_runs_and_releases() {
        let lock = Arc::new(LocalJobLock::new());
        let runner = JobRunner::new(lock.clone(), 60);

        let value = runner.run_exclusive("demo", || async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        // Released, so another holder can take it
        assert!(lock.try_acquire("demo", "someone-else", 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_second_run_fails_fast() {
        let lock = Arc::new(LocalJobLock::new());
        assert!(lock.try_acquire(jobs::PRICE_ADJUSTMENT, "other-node", 60).await.unwrap());

        let runner = JobRunner::new(lock, 60);
        let result = runner.run_exclusive(jobs::PRICE_ADJUSTMENT, || async { Ok(()) }).await;
        assert!(matches!(result, Err(CoreError::JobInProgress(ref job)) if job == "price-adjustment"));
    }

    #[tokio::test]
    async fn test_failed_job_still_releases() {
        let lock = Arc::new(LocalJobLock::new());
        let runner = JobRunner::new(lock.clone(), 60);

        let result: CoreResult<()> = runner
            .run_exclusive("demo", || async { Err(CoreError::ConfigMissing("pricing policy".into())) })
            .await;
        assert!(matches!(result, Err(CoreError::ConfigMissing(_))));
        assert!(lock.try_acquire("demo", "someone-else", 60).await.unwrap());
    }
}
