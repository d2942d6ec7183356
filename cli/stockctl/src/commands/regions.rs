//! Region listing.

use anyhow::Result;
use serde::Serialize;
use tabled::Tabled;

use crate::output::print_output;

use super::CommandContext;

#[derive(Debug, Serialize, Tabled)]
struct RegionRow {
    #[tabled(rename = "ID")]
    id: String,

    #[tabled(rename = "Name")]
    name: String,

    #[tabled(rename = "Endpoint")]
    endpoint: String,

    #[tabled(rename = "Countries")]
    countries: String,
}

pub fn run(ctx: CommandContext) -> Result<()> {
    let rows: Vec<RegionRow> = ctx
        .regions()
        .into_iter()
        .map(|region| RegionRow {
            id: region.id,
            name: region.name,
            endpoint: region.base_url,
            countries: region.countries.join(" "),
        })
        .collect();

    print_output(&rows, ctx.format);
    Ok(())
}
