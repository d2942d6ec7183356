//! # stockwatch-inventory
//!
//! Region-aware client for the public dedicated server order catalog and the
//! datacenter availability endpoints.
//!
//! ## Components
//!
//! - [`Region`]: static description of an upstream API deployment and the
//!   countries routed to it.
//! - [`ResponseCache`]: TTL cache of raw upstream responses, shared by every
//!   region and every caller.
//! - [`InventoryClient`]: one region's HTTP client wrapped with the cache.
//! - [`EndpointRegistry`]: resolves a region id to its client.
//!
//! Upstream "no stock" answers surface as [`InventoryError::NotAvailable`],
//! never as a generic upstream failure.

mod availability;
mod cache;
mod catalog;
mod client;
mod datacenter;
mod error;
mod region;
mod registry;

pub use availability::{
    available_datacenters, Availabilities, Availability, DatacenterAvailability,
};
pub use cache::{CacheConfig, CacheKey, CacheStats, Clock, ManualClock, ResponseCache, SystemClock};
pub use catalog::{Catalog, Locale, Plan, PlanBlobs, PlanCommercial, PlanConfiguration, Pricing};
pub use catalog::{PLAN_CATEGORIES, PRICE_DIVIDER};
pub use client::{ClientConfig, InventoryClient, AVAILABILITIES_PATH, CATALOG_PATH};
pub use datacenter::DatacenterSet;
pub use error::{InventoryError, UpstreamError};
pub use region::{Region, DEFAULT_REGION};
pub use registry::EndpointRegistry;
