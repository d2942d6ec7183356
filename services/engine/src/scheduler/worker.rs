//! Scheduler background worker.
//!
//! Runs the availability check and criterion reclamation on their intervals.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument};

use super::checker::SubscriptionChecker;
use crate::db::SubscriptionStore;

/// Scheduler timing.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub check_interval: Duration,
    pub reclaim_interval: Duration,
    pub page_size: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            reclaim_interval: Duration::from_secs(3600),
            page_size: 100,
        }
    }
}

/// Scheduler worker that runs the check loop.
pub struct SchedulerWorker {
    checker: SubscriptionChecker,
    store: SubscriptionStore,
    config: SchedulerConfig,
}

impl SchedulerWorker {
    pub fn new(checker: SubscriptionChecker, store: SubscriptionStore, config: SchedulerConfig) -> Self {
        Self {
            checker,
            store,
            config,
        }
    }

    /// Run the scheduler worker until shutdown is signaled.
    ///
    /// Passes run inline, so a slow pass delays the next one instead of
    /// overlapping it.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            check_interval_secs = self.config.check_interval.as_secs(),
            reclaim_interval_secs = self.config.reclaim_interval.as_secs(),
            page_size = self.config.page_size,
            "Starting scheduler worker"
        );

        let mut check = tokio::time::interval(self.config.check_interval);
        check.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut reclaim = tokio::time::interval(self.config.reclaim_interval);
        reclaim.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Wait a full interval before the first pass.
        check.tick().await;
        reclaim.tick().await;

        loop {
            tokio::select! {
                _ = check.tick() => {
                    if let Err(e) = self.checker.check_all().await {
                        error!(error = %e, "Availability check failed");
                    }
                }
                _ = reclaim.tick() => {
                    self.run_reclamation().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Scheduler worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn run_reclamation(&self) {
        match self.store.reclaim_orphaned_criteria().await {
            Ok(0) => {}
            Ok(removed) => info!(removed, "Reclaimed criteria without subscribers"),
            Err(e) => error!(error = %e, "Failed to reclaim criteria"),
        }
    }
}
