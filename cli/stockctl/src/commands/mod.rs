//! CLI commands.

mod check;
mod list;
mod regions;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use stockwatch_inventory::{
    CacheConfig, ClientConfig, EndpointRegistry, InventoryClient, Region, ResponseCache,
    DEFAULT_REGION,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// stockctl - query the dedicated server catalog and stock.
#[derive(Debug, Parser)]
#[command(name = "stockctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Region to query.
    #[arg(long, global = true, env = "STOCKCTL_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Override the API base URL of the selected region.
    #[arg(long, global = true, env = "STOCKCTL_ENDPOINT")]
    endpoint: Option<String>,

    /// Log filter for diagnostics on stderr.
    #[arg(long, global = true, env = "STOCKCTL_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List known regions and the countries they serve.
    Regions,

    /// List the plans offered in a country, cheapest first.
    List(list::ListArgs),

    /// Check where a plan is in stock.
    Check(check::CheckArgs),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Send diagnostics to stderr at the requested level.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_new(&self.log).unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let ctx = CommandContext {
            format: self.format,
            region: self.region,
            endpoint: self.endpoint,
        };

        match self.command {
            Commands::Regions => regions::run(ctx),
            Commands::List(args) => list::run(ctx, args).await,
            Commands::Check(args) => check::run(ctx, args).await,
            Commands::Version => {
                println!("stockctl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub format: OutputFormat,
    pub region: String,
    pub endpoint: Option<String>,
}

impl CommandContext {
    /// Known regions, with the endpoint override applied.
    pub fn regions(&self) -> Vec<Region> {
        Region::defaults()
            .into_iter()
            .map(|region| match &self.endpoint {
                Some(url) if region.id == self.region => region.with_base_url(url.clone()),
                _ => region,
            })
            .collect()
    }

    /// Registry over every region. A one-shot command has no use for a
    /// long-lived cache, but the client API requires one.
    pub fn registry(&self) -> Result<EndpointRegistry> {
        let cache = Arc::new(ResponseCache::new(CacheConfig::default()));
        Ok(EndpointRegistry::new(
            self.regions(),
            cache,
            &ClientConfig::default(),
        )?)
    }

    /// Client for the selected region.
    pub fn client<'a>(&self, registry: &'a EndpointRegistry) -> Result<&'a InventoryClient> {
        let client = registry.resolve(&self.region)?;
        debug!(region = %self.region, base_url = %client.region().base_url, "Using region");
        Ok(client)
    }
}
