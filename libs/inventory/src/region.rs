//! Upstream API regions.

use serde::Serialize;

/// Region used when none is specified.
pub const DEFAULT_REGION: &str = "ovh-eu";

/// An upstream API deployment and the countries routed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Region {
    /// Stable identifier, e.g. `ovh-eu`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// Country (subsidiary) codes served by this region.
    pub countries: Vec<String>,
}

impl Region {
    pub fn new(id: &str, name: &str, base_url: &str, countries: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            countries: countries.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// The regions known at startup.
    pub fn defaults() -> Vec<Region> {
        vec![
            Region::new(
                "ovh-eu",
                "Europe",
                "https://eu.api.ovh.com/1.0",
                &[
                    "CZ", "DE", "ES", "FI", "FR", "GB", "IE", "IT", "LT", "MA", "NL", "PL", "PT",
                    "SN", "TN",
                ],
            ),
            Region::new(
                "ovh-ca",
                "Canada",
                "https://ca.api.ovh.com/1.0",
                &["ASIA", "AU", "CA", "IN", "QC", "SG", "WE", "WS"],
            ),
            Region::new(
                "ovh-us",
                "United States",
                "https://api.us.ovhcloud.com/1.0",
                &["US"],
            ),
        ]
    }

    /// Returns a copy pointing at a different base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns true if the country is routed to this region.
    pub fn serves(&self, country: &str) -> bool {
        self.countries
            .iter()
            .any(|c| c.eq_ignore_ascii_case(country))
    }

    /// Environment variable suffix for this region, e.g. `OVH_EU`.
    pub fn env_key(&self) -> String {
        self.id.to_ascii_uppercase().replace('-', "_")
    }
}
