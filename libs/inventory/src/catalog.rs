//! Public order catalog model.
//!
//! Only the fields the engine reads are modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Prices are integers expressed in 10^-8 currency units.
pub const PRICE_DIVIDER: f64 = 100_000_000.0;

/// Known plan categories (`blobs.commercial.range`), including the empty
/// category for uncategorized plans.
pub const PLAN_CATEGORIES: [&str; 4] = ["kimsufi", "soyoustart", "rise", ""];

const DATACENTER_CONFIGURATION: &str = "dedicated_datacenter";

/// Snapshot of the plans offered in one country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub catalog_id: i64,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub plans: Vec<Plan>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Locale {
    #[serde(default)]
    pub currency_code: String,
    #[serde(default)]
    pub subsidiary: String,
}

/// An orderable server plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub plan_code: String,
    #[serde(default)]
    pub invoice_name: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub pricings: Vec<Pricing>,
    #[serde(default, alias = "configuration")]
    pub configurations: Vec<PlanConfiguration>,
    #[serde(default)]
    pub blobs: Option<PlanBlobs>,
}

/// One pricing tier of a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    #[serde(default)]
    pub phase: i64,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub tax: i64,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub interval: i64,
    #[serde(default)]
    pub interval_unit: String,
    #[serde(default)]
    pub capacities: Vec<String>,
}

impl Pricing {
    /// Price in currency units.
    pub fn amount(&self) -> f64 {
        self.price as f64 / PRICE_DIVIDER
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanConfiguration {
    pub name: String,
    #[serde(default)]
    pub is_custom: bool,
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanBlobs {
    #[serde(default)]
    pub commercial: Option<PlanCommercial>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanCommercial {
    #[serde(default)]
    pub range: Option<String>,
}

impl Plan {
    /// The tier used for display and sorting.
    ///
    /// First phase-1 tier in `default` mode, else the first tier, else a zero
    /// price.
    pub fn effective_pricing(&self) -> Pricing {
        self.pricings
            .iter()
            .find(|p| p.phase == 1 && p.mode == "default")
            .or_else(|| self.pricings.first())
            .cloned()
            .unwrap_or_default()
    }

    /// Commercial range, empty when uncategorized.
    pub fn category(&self) -> &str {
        self.blobs
            .as_ref()
            .and_then(|b| b.commercial.as_ref())
            .and_then(|c| c.range.as_deref())
            .unwrap_or("")
    }

    /// Datacenters the plan can be ordered in.
    pub fn datacenters(&self) -> &[String] {
        self.configurations
            .iter()
            .find(|c| c.name == DATACENTER_CONFIGURATION)
            .map(|c| c.values.as_slice())
            .unwrap_or(&[])
    }
}

impl Catalog {
    /// Look up a plan by code.
    pub fn plan(&self, plan_code: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.plan_code == plan_code)
    }

    pub fn has_plan(&self, plan_code: &str) -> bool {
        self.plan(plan_code).is_some()
    }

    /// Plans of a category, cheapest first.
    pub fn plans_in_category(&self, category: &str) -> Vec<&Plan> {
        let mut plans: Vec<&Plan> = self
            .plans
            .iter()
            .filter(|p| p.category() == category)
            .collect();
        plans.sort_by_key(|p| p.effective_pricing().price);
        plans
    }
}
