//! Availability check.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use stockwatch_inventory::{available_datacenters, DatacenterSet};
use tabled::Tabled;

use crate::output::{print_info, print_output, print_success, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Plan code, e.g. 24ska01.
    #[arg(long)]
    plan_code: String,

    /// Comma separated datacenters. Omit to check all.
    #[arg(long, default_value = "")]
    datacenters: String,
}

#[derive(Debug, Serialize, Tabled)]
struct DatacenterRow {
    #[tabled(rename = "Datacenter")]
    datacenter: String,

    #[tabled(rename = "Status")]
    status: String,
}

pub async fn run(ctx: CommandContext, args: CheckArgs) -> Result<()> {
    let datacenters = DatacenterSet::parse(&args.datacenters);
    let registry = ctx.registry()?;
    let client = ctx.client(&registry)?;

    let set = match client.get_availabilities(&datacenters, &args.plan_code).await {
        Ok(set) => set,
        Err(e) if e.is_not_available() => {
            report_unavailable(&ctx, &args.plan_code, &datacenters);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut available = available_datacenters(&set, &args.plan_code);
    available.retain(|dc| datacenters.matches(dc));
    if available.is_empty() {
        report_unavailable(&ctx, &args.plan_code, &datacenters);
        return Ok(());
    }

    let mut rows: Vec<DatacenterRow> = set
        .iter()
        .filter(|a| a.plan_code == args.plan_code)
        .flat_map(|a| a.datacenters.iter())
        .filter(|d| d.is_available() && datacenters.matches(&d.datacenter))
        .map(|d| DatacenterRow {
            datacenter: d.datacenter.clone(),
            status: d.availability.clone(),
        })
        .collect();
    rows.sort_by(|a, b| a.datacenter.cmp(&b.datacenter));
    rows.dedup_by(|a, b| a.datacenter == b.datacenter);

    if ctx.format == OutputFormat::Table {
        print_success(&format!(
            "{} is available in {}",
            args.plan_code,
            available.join(", ")
        ));
    }
    print_output(&rows, ctx.format);
    Ok(())
}

fn report_unavailable(ctx: &CommandContext, plan_code: &str, datacenters: &DatacenterSet) {
    match ctx.format {
        OutputFormat::Table => {
            print_info(&format!("{plan_code} is not available in {datacenters}"));
        }
        OutputFormat::Json => print_output::<DatacenterRow>(&[], ctx.format),
    }
}
