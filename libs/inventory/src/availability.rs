//! Datacenter availability model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Statuses that mean "cannot be ordered right now".
const UNAVAILABLE_STATUSES: [&str; 2] = ["unavailable", "comingSoon"];

/// Availability answer for a plan/datacenter query.
pub type Availabilities = Vec<Availability>;

/// Stock status of one hardware configuration of a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    #[serde(default)]
    pub fqn: String,
    pub plan_code: String,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub memory: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub datacenters: Vec<DatacenterAvailability>,
}

/// Stock status in one datacenter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatacenterAvailability {
    pub datacenter: String,
    pub availability: String,
}

impl DatacenterAvailability {
    pub fn is_available(&self) -> bool {
        !UNAVAILABLE_STATUSES.contains(&self.availability.as_str())
    }
}

impl Availability {
    /// Returns true if any datacenter has stock.
    pub fn is_available(&self) -> bool {
        self.datacenters.iter().any(DatacenterAvailability::is_available)
    }
}

/// Datacenters currently showing stock for `plan_code`, sorted and
/// deduplicated. An empty list means "not available anywhere queried".
pub fn available_datacenters(set: &[Availability], plan_code: &str) -> Vec<String> {
    set.iter()
        .filter(|a| a.plan_code == plan_code)
        .flat_map(|a| a.datacenters.iter())
        .filter(|d| d.is_available())
        .map(|d| d.datacenter.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(plan_code: &str, statuses: &[(&str, &str)]) -> Availability {
        Availability {
            fqn: format!("{plan_code}.ram-32g.softraid-2x2000sa"),
            plan_code: plan_code.to_string(),
            server: plan_code.to_string(),
            datacenters: statuses
                .iter()
                .map(|(dc, status)| DatacenterAvailability {
                    datacenter: dc.to_string(),
                    availability: status.to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_unavailable_statuses() {
        let set = vec![entry(
            "24ska01",
            &[("gra", "unavailable"), ("rbx", "comingSoon")],
        )];
        assert!(available_datacenters(&set, "24ska01").is_empty());
        assert!(!set[0].is_available());
    }

    #[test]
    fn test_collects_sorted_unique_datacenters_for_plan() {
        let set = vec![
            entry("24ska01", &[("rbx", "1H-low"), ("gra", "unavailable")]),
            entry("24ska01", &[("gra", "72H"), ("rbx", "1H-high")]),
            entry("24sk50", &[("bhs", "available")]),
        ];
        assert_eq!(available_datacenters(&set, "24ska01"), ["gra", "rbx"]);
        assert_eq!(available_datacenters(&set, "24sk50"), ["bhs"]);
        assert!(available_datacenters(&set, "other").is_empty());
    }

    #[test]
    fn test_deserialization() {
        let json = r#"[
            {
                "fqn": "24ska01.ram-64g-ecc-2133.softraid-2x2000sa",
                "memory": "ram-64g-ecc-2133",
                "planCode": "24ska01",
                "server": "24ska01",
                "storage": "softraid-2x2000sa",
                "systemStorage": null,
                "datacenters": [
                    {"availability": "unavailable", "datacenter": "gra"},
                    {"availability": "1H-low", "datacenter": "rbx"}
                ]
            }
        ]"#;
        let set: Availabilities = serde_json::from_str(json).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(available_datacenters(&set, "24ska01"), ["rbx"]);
    }
}
