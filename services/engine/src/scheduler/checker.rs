//! One pass of the availability check over all criteria.

use std::sync::Arc;

use stockwatch_inventory::{available_datacenters, EndpointRegistry, InventoryError};
use tracing::{debug, error, info, warn};

use crate::db::{CriterionEntry, CriterionSort, DbError, SubscriptionStore, WatchCriterion};
use crate::notify::{AvailabilityNotice, Notifier};

/// Statistics from one check pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckStats {
    pub pages: u64,
    /// Criteria looked up upstream.
    pub checked: u64,
    /// Criteria without subscribers.
    pub skipped: u64,
    /// Criteria whose lookup failed; retried next pass.
    pub failed: u64,
    /// Criteria found in stock.
    pub available: u64,
    pub notified: u64,
    pub delivery_failures: u64,
}

/// Checks stored criteria against live availability and notifies.
pub struct SubscriptionChecker {
    store: SubscriptionStore,
    registry: Arc<EndpointRegistry>,
    notifier: Arc<dyn Notifier>,
    page_size: i64,
}

impl SubscriptionChecker {
    pub fn new(
        store: SubscriptionStore,
        registry: Arc<EndpointRegistry>,
        notifier: Arc<dyn Notifier>,
        page_size: i64,
    ) -> Self {
        Self {
            store,
            registry,
            notifier,
            page_size: page_size.max(1),
        }
    }

    /// Walk every criterion once.
    ///
    /// The walk ends on the first empty page. Failures for a single criterion
    /// or user are logged and counted; only a failed page read aborts the
    /// pass.
    pub async fn check_all(&self) -> Result<CheckStats, DbError> {
        let mut stats = CheckStats::default();
        let mut offset = 0;

        loop {
            let page = self
                .store
                .list_page(CriterionSort::Id, self.page_size, offset)
                .await?;
            if page.is_empty() {
                break;
            }

            stats.pages += 1;
            debug!(offset, entries = page.entries.len(), total = page.total, "Checking page");

            for entry in &page.entries {
                self.check_entry(entry, &mut stats).await;
            }

            offset += self.page_size;
        }

        info!(
            pages = stats.pages,
            checked = stats.checked,
            skipped = stats.skipped,
            failed = stats.failed,
            available = stats.available,
            notified = stats.notified,
            delivery_failures = stats.delivery_failures,
            "Availability check complete"
        );

        Ok(stats)
    }

    async fn check_entry(&self, entry: &CriterionEntry, stats: &mut CheckStats) {
        let criterion = &entry.criterion;
        if entry.subscribers.is_empty() {
            stats.skipped += 1;
            return;
        }

        stats.checked += 1;

        let datacenters = match self.lookup(criterion).await {
            Ok(datacenters) => datacenters,
            Err(e) => {
                warn!(
                    criterion_id = criterion.id,
                    plan_code = %criterion.plan_code,
                    region = %criterion.region,
                    error = %e,
                    "Availability lookup failed"
                );
                stats.failed += 1;
                return;
            }
        };

        let mut delivered = 0;
        if !datacenters.is_empty() {
            stats.available += 1;
            let notice = AvailabilityNotice {
                plan_code: criterion.plan_code.clone(),
                region: criterion.region.clone(),
                datacenters,
            };
            delivered = self.notify(entry, &notice, stats).await;
        }

        if let Err(e) = self.store.record_check(criterion.id, delivered).await {
            error!(criterion_id = criterion.id, error = %e, "Failed to record check");
        }
    }

    /// Datacenters where the criterion is currently in stock.
    async fn lookup(&self, criterion: &WatchCriterion) -> Result<Vec<String>, InventoryError> {
        let client = self.registry.resolve(&criterion.region)?;

        match client
            .get_availabilities(&criterion.datacenters, &criterion.plan_code)
            .await
        {
            Ok(set) => {
                let mut datacenters = available_datacenters(&set, &criterion.plan_code);
                datacenters.retain(|dc| criterion.datacenters.matches(dc));
                Ok(datacenters)
            }
            Err(e) if e.is_not_available() => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Deliver to every subscriber. Returns the number of successful
    /// deliveries.
    async fn notify(
        &self,
        entry: &CriterionEntry,
        notice: &AvailabilityNotice,
        stats: &mut CheckStats,
    ) -> i64 {
        let criterion_id = entry.criterion.id;
        let mut delivered = 0;

        for user in &entry.subscribers {
            if let Err(e) = self.notifier.send(user, notice).await {
                warn!(user_id = user.id, criterion_id, error = %e, "Delivery failed");
                stats.delivery_failures += 1;
                continue;
            }

            delivered += 1;
            stats.notified += 1;
            info!(
                user_id = user.id,
                criterion_id,
                plan_code = %notice.plan_code,
                datacenters = ?notice.datacenters,
                "User notified"
            );

            match self.store.unsubscribe(user.id, criterion_id).await {
                Ok(()) | Err(DbError::NotFound(_)) => {}
                Err(e) => {
                    error!(user_id = user.id, criterion_id, error = %e, "Failed to remove notified subscription");
                }
            }
        }

        delivered
    }
}
