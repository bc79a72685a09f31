use coachline_core::{CoreError, CoreResult};
use coachline_planning::{jobs, JobRunner};
use coachline_store::app_config::SchedulerConfig;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use crate::state::AppState;

/// Spawns the periodic jobs. Each tick goes through the job lock, so running
/// several API nodes never repeats a job.
pub fn start_scheduler(state: &AppState, config: &SchedulerConfig) -> Vec<JoinHandle<()>> {
    let adjuster = state.price_adjuster.clone();
    let rebalancer = state.rebalancer.clone();
    let cleanup = state.cleanup.clone();

    vec![
        tokio::spawn(run_every(
            jobs::PRICE_ADJUSTMENT,
            Duration::from_secs(config.price_adjustment_interval_secs),
            state.runner.clone(),
            move || {
                let adjuster = adjuster.clone();
                async move { adjuster.run().await }
            },
        )),
        tokio::spawn(run_every(
            jobs::CAPACITY_REBALANCE,
            Duration::from_secs(config.rebalance_interval_secs),
            state.runner.clone(),
            move || {
                let rebalancer = rebalancer.clone();
                async move { rebalancer.run().await }
            },
        )),
        tokio::spawn(run_every(
            jobs::INVENTORY_CLEANUP,
            Duration::from_secs(config.cleanup_interval_secs),
            state.runner.clone(),
            move || {
                let cleanup = cleanup.clone();
                async move { cleanup.run().await }
            },
        )),
    ]
}

async fn run_every<T, F, Fut>(job: &'static str, period: Duration, runner: Arc<JobRunner>, mut task: F)
where
    T: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = CoreResult<T>>,
{
    let mut ticker = interval(period.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; wait a full period before the first run
    ticker.tick().await;

    info!("Scheduled job {} every {:?}", job, period);

    loop {
        ticker.tick().await;
        match runner.run_exclusive(job, || task()).await {
            Ok(outcome) => info!("Job {} result: {:?}", job, outcome),
            Err(CoreError::JobInProgress(_)) => {}
            // Already logged by the runner; retried on the next tick
            Err(e) => warn!("Job {} will retry next period: {}", job, e),
        }
    }
}
