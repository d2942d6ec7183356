//! Operations consumed by front-ends.
//!
//! [`WatchService`] combines the endpoint registry and the subscription
//! store behind strongly typed calls. Expected outcomes (no stock, duplicate
//! subscription, nothing to remove) stay distinguishable through
//! [`ServiceError::is_expected`].

use std::sync::Arc;

use stockwatch_inventory::{
    available_datacenters, Catalog, DatacenterSet, EndpointRegistry, InventoryError, Plan, Region,
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::db::{DbError, SubscriptionStore, User, UserSubscription};

/// Errors returned by [`WatchService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl ServiceError {
    /// Returns true for outcomes to show to the user rather than report.
    pub fn is_expected(&self) -> bool {
        match self {
            Self::Inventory(e) => e.is_not_available(),
            Self::Store(e) => e.is_expected(),
        }
    }
}

/// Catalog lookups and subscription management.
#[derive(Debug, Clone)]
pub struct WatchService {
    registry: Arc<EndpointRegistry>,
    store: SubscriptionStore,
}

impl WatchService {
    pub fn new(registry: Arc<EndpointRegistry>, store: SubscriptionStore) -> Self {
        Self { registry, store }
    }

    pub fn regions(&self) -> &[Region] {
        self.registry.regions()
    }

    pub fn store(&self) -> &SubscriptionStore {
        &self.store
    }

    /// Full catalog of a country.
    pub async fn list_catalog(&self, region: &str, country: &str) -> Result<Catalog, ServiceError> {
        let client = self.registry.resolve(region)?;
        Ok(client.list_catalog(country).await?)
    }

    /// Plans of a country, cheapest first, optionally restricted to one
    /// category.
    pub async fn list_plans(
        &self,
        region: &str,
        country: &str,
        category: Option<&str>,
    ) -> Result<Vec<Plan>, ServiceError> {
        let catalog = self.list_catalog(region, country).await?;
        let plans = match category {
            Some(category) => catalog
                .plans_in_category(category)
                .into_iter()
                .cloned()
                .collect(),
            None => {
                let mut plans = catalog.plans;
                plans.sort_by_key(|p| p.effective_pricing().price);
                plans
            }
        };
        Ok(plans)
    }

    /// Datacenters where a plan is in stock right now.
    ///
    /// Fails with [`InventoryError::NotAvailable`] when it is nowhere in
    /// stock.
    pub async fn check_availability(
        &self,
        region: &str,
        plan_code: &str,
        datacenters: &DatacenterSet,
    ) -> Result<Vec<String>, ServiceError> {
        let client = self.registry.resolve(region)?;
        let set = client.get_availabilities(datacenters, plan_code).await?;

        let mut available = available_datacenters(&set, plan_code);
        available.retain(|dc| datacenters.matches(dc));
        if available.is_empty() {
            return Err(InventoryError::NotAvailable {
                plan_code: plan_code.to_string(),
                datacenters: datacenters.to_string(),
            }
            .into());
        }

        Ok(available)
    }

    /// Watch a plan for a user. Returns the criterion id.
    ///
    /// The plan is looked up upstream first. "Not available" is the normal
    /// reason to subscribe and proceeds; an upstream failure is returned and
    /// nothing is stored.
    pub async fn subscribe(
        &self,
        user: &User,
        region: &str,
        plan_code: &str,
        datacenters: &DatacenterSet,
    ) -> Result<i64, ServiceError> {
        let client = self.registry.resolve(region)?;

        match client.get_availabilities(datacenters, plan_code).await {
            Ok(_) => {}
            Err(e) if e.is_not_available() => {
                debug!(plan_code, region, "Plan currently unavailable");
            }
            Err(e) => {
                warn!(plan_code, region, error = %e, "Pre-subscription lookup failed");
                return Err(e.into());
            }
        }

        Ok(self
            .store
            .subscribe(user, region, plan_code, datacenters)
            .await?)
    }

    pub async fn unsubscribe(&self, user_id: i64, criterion_id: i64) -> Result<(), ServiceError> {
        Ok(self.store.unsubscribe(user_id, criterion_id).await?)
    }

    /// Returns the number of subscriptions removed.
    pub async fn unsubscribe_all(&self, user_id: i64) -> Result<u64, ServiceError> {
        Ok(self.store.unsubscribe_all(user_id).await?)
    }

    pub async fn list_for_user(&self, user_id: i64) -> Result<Vec<UserSubscription>, ServiceError> {
        Ok(self.store.list_for_user(user_id).await?)
    }
}
