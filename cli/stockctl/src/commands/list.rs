//! Catalog listing joined with live availability.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use stockwatch_inventory::{
    available_datacenters, Availability, Catalog, DatacenterSet, Plan, PLAN_CATEGORIES,
};
use tabled::Tabled;
use tracing::info;

use crate::output::print_output;

use super::CommandContext;

const STATUS_AVAILABLE: &str = "available";
const STATUS_UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Country (OVH subsidiary) code.
    #[arg(short, long, default_value = "FR")]
    country: String,

    /// Commercial range: kimsufi, soyoustart, rise. Omit for every plan.
    #[arg(long)]
    category: Option<String>,

    /// Only list this plan code.
    #[arg(short, long)]
    plan_code: Option<String>,

    /// Comma separated datacenters to check. Omit to check all.
    #[arg(short, long, default_value = "")]
    datacenters: String,
}

#[derive(Debug, Serialize, Tabled)]
struct PlanRow {
    #[tabled(rename = "Plan")]
    plan_code: String,

    #[tabled(rename = "Category")]
    category: String,

    #[tabled(rename = "Name")]
    name: String,

    #[tabled(rename = "Price")]
    price: String,

    #[tabled(rename = "Status")]
    status: String,

    #[tabled(rename = "Datacenters")]
    datacenters: String,
}

impl PlanRow {
    fn new(plan: &Plan, currency: &str, available: Vec<String>) -> Self {
        let pricing = plan.effective_pricing();
        let interval = if pricing.interval_unit.is_empty() {
            String::new()
        } else {
            format!("/{}", pricing.interval_unit)
        };
        let status = if available.is_empty() {
            STATUS_UNAVAILABLE
        } else {
            STATUS_AVAILABLE
        };

        Self {
            plan_code: plan.plan_code.clone(),
            category: plan.category().to_string(),
            name: plan.invoice_name.clone(),
            price: format!("{:.2} {currency}{interval}", pricing.amount()),
            status: status.to_string(),
            datacenters: available.join(", "),
        }
    }

    fn is_available(&self) -> bool {
        self.status == STATUS_AVAILABLE
    }
}

/// Rows grouped by category in catalog range order, cheapest first within a
/// category. Datacenters outside `datacenters` never count as stock.
fn build_rows(
    catalog: &Catalog,
    availabilities: &[Availability],
    category: Option<&str>,
    plan_code: Option<&str>,
    datacenters: &DatacenterSet,
) -> Vec<PlanRow> {
    let currency = catalog.locale.currency_code.as_str();

    PLAN_CATEGORIES
        .iter()
        .filter(|c| category.is_none_or(|wanted| wanted == **c))
        .flat_map(|c| catalog.plans_in_category(c))
        .filter(|plan| plan_code.is_none_or(|code| plan.plan_code == code))
        .map(|plan| {
            let mut available = available_datacenters(availabilities, &plan.plan_code);
            available.retain(|dc| datacenters.matches(dc));
            PlanRow::new(plan, currency, available)
        })
        .collect()
}

pub async fn run(ctx: CommandContext, args: ListArgs) -> Result<()> {
    if let Some(category) = &args.category {
        if !PLAN_CATEGORIES.contains(&category.as_str()) {
            bail!(
                "unknown category '{category}', expected one of: {}",
                PLAN_CATEGORIES
                    .iter()
                    .filter(|c| !c.is_empty())
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    let datacenters = DatacenterSet::parse(&args.datacenters);
    let plan_code = args.plan_code.as_deref().map(str::trim).filter(|c| !c.is_empty());

    let registry = ctx.registry()?;
    let client = ctx.client(&registry)?;
    let catalog = client.list_catalog(&args.country).await?;
    let availabilities = match client
        .get_availabilities(&datacenters, plan_code.unwrap_or_default())
        .await
    {
        Ok(set) => set,
        Err(e) if e.is_not_available() => Vec::new(),
        Err(e) => return Err(e.into()),
    };
    info!(plans = catalog.plans.len(), "Fetched catalog");

    let rows = build_rows(
        &catalog,
        &availabilities,
        args.category.as_deref(),
        plan_code,
        &datacenters,
    );
    print_output(&rows, ctx.format);

    if !rows.iter().any(PlanRow::is_available) {
        bail!("no server available");
    }
    Ok(())
}
