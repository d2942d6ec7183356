//! Per-region catalog and availability client.
//!
//! Provides the two read-only upstream queries:
//! - Listing the public order catalog of a country
//! - Listing datacenter availability for a plan
//!
//! Both go through the shared [`ResponseCache`]. Only responses that decode
//! successfully and carry an answer are cached.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::availability::Availabilities;
use crate::cache::{CacheKey, ResponseCache};
use crate::catalog::Catalog;
use crate::datacenter::DatacenterSet;
use crate::error::{InventoryError, UpstreamError};
use crate::region::Region;

/// Path of the public order catalog endpoint.
pub const CATALOG_PATH: &str = "/order/catalog/public/eco";

/// Path of the datacenter availability endpoint.
pub const AVAILABILITIES_PATH: &str = "/dedicated/server/datacenter/availabilities";

/// HTTP client settings shared by every region.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Error body returned by the upstream API.
#[derive(Debug, Deserialize)]
struct UpstreamMessage {
    message: String,
}

/// Outcome of a cache-or-fetch.
enum Fetched<T> {
    Found(T),
    Missing,
}

/// Catalog and availability client for one region.
#[derive(Debug, Clone)]
pub struct InventoryClient {
    region: Region,
    http: reqwest::Client,
    cache: Arc<ResponseCache>,
}

impl InventoryClient {
    /// Create a client for a region, sharing the given cache.
    pub fn new(
        region: Region,
        cache: Arc<ResponseCache>,
        config: &ClientConfig,
    ) -> Result<Self, InventoryError> {
        if !(region.base_url.starts_with("http://") || region.base_url.starts_with("https://")) {
            return Err(InventoryError::InvalidBaseUrl {
                region: region.id.clone(),
                url: region.base_url.clone(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("stockwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| InventoryError::ClientBuild {
                region: region.id.clone(),
                source,
            })?;

        Ok(Self {
            region,
            http,
            cache,
        })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Fetch the catalog of plans offered in a country.
    ///
    /// The country must be one this region serves.
    pub async fn list_catalog(&self, country: &str) -> Result<Catalog, InventoryError> {
        let country = country.trim().to_ascii_uppercase();
        if !self.region.serves(&country) {
            return Err(InventoryError::UnsupportedCountry {
                region: self.region.id.clone(),
                country,
            });
        }

        let params = [("ovhSubsidiary", country.as_str())];

        match self.fetch(CATALOG_PATH, &params, |_: &Catalog| true).await? {
            Fetched::Found(catalog) => Ok(catalog),
            Fetched::Missing => Err(UpstreamError::Status {
                url: self.url(CATALOG_PATH),
                status: 404,
                message: format!("no catalog for country {country}"),
            }
            .into()),
        }
    }

    /// Fetch the stock status of a plan, optionally restricted to
    /// datacenters. An empty set queries every datacenter and an empty plan
    /// code queries every plan.
    pub async fn get_availabilities(
        &self,
        datacenters: &DatacenterSet,
        plan_code: &str,
    ) -> Result<Availabilities, InventoryError> {
        let filter = datacenters.to_query();
        let mut params = Vec::with_capacity(2);
        if !plan_code.is_empty() {
            params.push(("planCode", plan_code));
        }
        if !datacenters.is_any() {
            params.push(("datacenters", filter.as_str()));
        }

        match self
            .fetch(AVAILABILITIES_PATH, &params, |set: &Availabilities| {
                !set.is_empty()
            })
            .await?
        {
            Fetched::Found(set) => Ok(set),
            Fetched::Missing => Err(InventoryError::NotAvailable {
                plan_code: plan_code.to_string(),
                datacenters: datacenters.to_string(),
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.region.base_url, path)
    }

    /// Serve from cache or fetch, decode, and cache.
    ///
    /// A 404 or a decoded value rejected by `has_answer` yields
    /// [`Fetched::Missing`] and leaves the cache untouched.
    async fn fetch<T, F>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        has_answer: F,
    ) -> Result<Fetched<T>, UpstreamError>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let url = self.url(path);
        let key = CacheKey::new(&self.region.id, path, params.iter().copied());

        if let Some(body) = self.cache.get(&key).await {
            debug!(region = %self.region.id, key = %key, "Cache hit");
            let value = decode(&url, &body)?;
            return Ok(Fetched::Found(value));
        }

        debug!(region = %self.region.id, key = %key, url = %url, "Cache miss, fetching");

        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!(region = %self.region.id, url = %url, "Upstream has no matching entry");
            return Ok(Fetched::Missing);
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            let message = serde_json::from_slice::<UpstreamMessage>(&body)
                .map(|m| m.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            warn!(
                region = %self.region.id,
                status = status.as_u16(),
                message = %message,
                "Upstream request failed"
            );
            return Err(UpstreamError::Status {
                url,
                status: status.as_u16(),
                message,
            });
        }

        let value: T = decode(&url, &body)?;
        if !has_answer(&value) {
            return Ok(Fetched::Missing);
        }

        self.cache.insert(key, body).await;
        Ok(Fetched::Found(value))
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &Bytes) -> Result<T, UpstreamError> {
    serde_json::from_slice(body).map_err(|source| UpstreamError::Decode {
        url: url.to_string(),
        source,
    })
}
