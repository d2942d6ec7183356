//! Error display for the CLI.

use colored::Colorize;
use stockwatch_inventory::{InventoryError, UpstreamError};

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(inventory_err) = err.downcast_ref::<InventoryError>() {
        match inventory_err {
            InventoryError::UnknownRegion(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Run `stockctl regions` to list known regions.".yellow()
                );
            }
            InventoryError::UnsupportedCountry { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Run `stockctl regions` to see which countries each region serves."
                        .yellow()
                );
            }
            InventoryError::Upstream(UpstreamError::Transport { .. }) => {
                eprintln!(
                    "\n{}",
                    "Hint: Check your network connection and the --endpoint value.".yellow()
                );
            }
            InventoryError::Upstream(UpstreamError::Status { status, .. }) if *status >= 500 => {
                eprintln!(
                    "\n{}",
                    "Hint: The upstream API is failing; retry later.".yellow()
                );
            }
            _ => {}
        }
    }
}
