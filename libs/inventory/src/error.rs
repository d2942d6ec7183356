//! Error types for inventory operations.

use thiserror::Error;

/// Errors returned by the catalog and availability client.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The upstream API could not be reached or returned garbage.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The upstream has no matching stock for the query.
    ///
    /// This is an expected outcome, not a failure.
    #[error("plan {plan_code} is not available in {datacenters}")]
    NotAvailable {
        plan_code: String,
        datacenters: String,
    },

    /// No client is registered for the requested region.
    #[error("unknown region: {0}")]
    UnknownRegion(String),

    /// The country is not routed to the region that was asked.
    #[error("country {country} is not served by region {region}")]
    UnsupportedCountry { region: String, country: String },

    /// The HTTP client for a region could not be built.
    #[error("failed to build HTTP client for region {region}: {source}")]
    ClientBuild {
        region: String,
        #[source]
        source: reqwest::Error,
    },

    /// A region was configured with an unusable base URL.
    #[error("invalid base URL for region {region}: {url}")]
    InvalidBaseUrl { region: String, url: String },
}

impl InventoryError {
    /// Returns true if the upstream signalled "no stock".
    pub fn is_not_available(&self) -> bool {
        matches!(self, Self::NotAvailable { .. })
    }

    /// Returns true for transport, status, or decode failures.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}

/// Transport or decode failure against the upstream API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request never produced a response.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a non-success status.
    #[error("upstream returned {status} for {url}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    /// The response body was not the expected JSON document.
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
