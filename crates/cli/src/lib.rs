pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "cotizador",
    about = "Cotizador operator CLI",
    long_about = "Operate the quote service: migrations, readiness checks, config inspection, \
                  catalog seeding, and offline pricing.",
    after_help = "Examples:\n  cotizador doctor --json\n  cotizador config\n  cotizador price --input cart.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Bring the quote database schema up to date")]
    Migrate,
    #[command(about = "Prepare the schema and drop a sample catalog into the data directory")]
    Seed,
    #[command(about = "Check config, database, catalog and PDF renderer readiness")]
    Doctor {
        #[arg(long, help = "Print the report as JSON instead of text")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution and redaction")]
    Config,
    #[command(about = "Price a cart offline against the catalog, without touching the database")]
    Price {
        #[arg(long, help = "Path to a JSON file holding the quote input")]
        input: PathBuf,
        #[arg(long, help = "Catalog file to price against (defaults to the data directory)")]
        catalog: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Price { input, catalog } => commands::price::run(&input, catalog.as_deref()),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
