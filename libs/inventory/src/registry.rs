//! Region id to client resolution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::ResponseCache;
use crate::client::{ClientConfig, InventoryClient};
use crate::error::InventoryError;
use crate::region::Region;

/// Immutable map of region clients, built once at startup.
#[derive(Debug)]
pub struct EndpointRegistry {
    regions: Vec<Region>,
    clients: HashMap<String, InventoryClient>,
    cache: Arc<ResponseCache>,
}

impl EndpointRegistry {
    /// Build one client per region. All clients share `cache`.
    pub fn new(
        regions: Vec<Region>,
        cache: Arc<ResponseCache>,
        config: &ClientConfig,
    ) -> Result<Self, InventoryError> {
        let mut clients = HashMap::with_capacity(regions.len());
        for region in &regions {
            debug!(region = %region.id, base_url = %region.base_url, "Registering region client");
            let client = InventoryClient::new(region.clone(), cache.clone(), config)?;
            clients.insert(region.id.clone(), client);
        }

        Ok(Self {
            regions,
            clients,
            cache,
        })
    }

    /// Returns the client for a region id.
    pub fn resolve(&self, region: &str) -> Result<&InventoryClient, InventoryError> {
        self.clients
            .get(region)
            .ok_or_else(|| InventoryError::UnknownRegion(region.to_string()))
    }

    /// Registered regions in registration order.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// The region a country is routed to, if any.
    pub fn region_for_country(&self, country: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.serves(country))
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }
}
