use std::fs;
use std::path::Path;

use cotizador_core::catalog::loader;
use cotizador_core::domain::quote::QuoteInput;
use cotizador_core::pricing::{price_quote, PricingSettings};

use crate::commands::{self, CommandResult, EXIT_IO, EXIT_PRICING};

/// Offline pricing: catalog file in, totals JSON out. No database, no files
/// written, useful for checking a cart before creating the real quote.
pub fn run(input_path: &Path, catalog_path: Option<&Path>) -> CommandResult {
    price(input_path, catalog_path).unwrap_or_else(|failure| failure)
}

fn price(input_path: &Path, catalog_path: Option<&Path>) -> Result<CommandResult, CommandResult> {
    let config = commands::load_config("price")?;

    let raw = fs::read_to_string(input_path).map_err(|error| {
        CommandResult::failure(
            "price",
            "input_read",
            format!("could not read `{}`: {error}", input_path.display()),
            EXIT_IO,
        )
    })?;
    let input: QuoteInput = serde_json::from_str(&raw).map_err(|error| {
        CommandResult::failure("price", "input_parse", format!("invalid quote input: {error}"), EXIT_IO)
    })?;

    let catalog = match catalog_path {
        Some(path) => loader::load_file(path, config.pricing.default_deposit_rate),
        None => loader::load_from_dir(&config.files.data_dir, config.pricing.default_deposit_rate),
    }
    .map_err(|error| {
        CommandResult::failure("price", "catalog_load", error.to_string(), EXIT_IO)
    })?;

    let settings = PricingSettings {
        iva_rate: config.pricing.iva_rate,
        default_deposit_rate: config.pricing.default_deposit_rate,
    };
    let totals = price_quote(&catalog, &input, settings).map_err(|error| {
        CommandResult::failure("price", "pricing", error.to_string(), EXIT_PRICING)
    })?;

    let output = serde_json::to_string_pretty(&totals)
        .unwrap_or_else(|error| format!("{{\"error\":\"{error}\"}}"));
    Ok(CommandResult { exit_code: 0, output })
}
