use std::fs;

use cotizador_core::catalog::loader::CANDIDATE_FILES;
use cotizador_core::config::AppConfig;

use crate::commands::{self, CommandResult, EXIT_IO};

const SAMPLE_CATALOG: &str = "\
sku,name,category,section,price,depositRate,discountable
SILLA-01,Silla plegable,Mobiliario,todos,25,0,
MESA-01,Mesa redonda 10 personas,Mobiliario,todos,120,0,
TARIMA-01,Tarima 2x1,Escenario,corporativo,350,0.10,
SONIDO-01,Equipo de sonido basico,Audio,todos,1500,0.15,
MESERO-01,Mesero (turno 6 horas),Personal,todos,600,0,
FLETE-01,Flete zona metropolitana,Otros,todos,800,0,0
";

/// Prepares a working environment: schema migrated and a sample catalog in
/// place. Never overwrites an existing catalog file.
pub fn run() -> CommandResult {
    seed().unwrap_or_else(|failure| failure)
}

fn seed() -> Result<CommandResult, CommandResult> {
    let config = commands::load_config("seed")?;

    commands::block_on("seed", async {
        let pool = commands::migrated_pool("seed", &config).await?;
        pool.close().await;
        Ok(())
    })?;

    let catalog_note = ensure_sample_catalog(&config)?;
    Ok(CommandResult::success("seed", format!("schema migrated; {catalog_note}")))
}

fn ensure_sample_catalog(config: &AppConfig) -> Result<String, CommandResult> {
    let existing = CANDIDATE_FILES
        .iter()
        .map(|candidate| config.files.data_dir.join(candidate))
        .find(|path| path.exists());
    if let Some(path) = existing {
        return Ok(format!("catalog already present at {}", path.display()));
    }

    let io_failure = |context: &str, error: std::io::Error| {
        CommandResult::failure("seed", "catalog_write", format!("{context}: {error}"), EXIT_IO)
    };

    fs::create_dir_all(&config.files.data_dir)
        .map_err(|error| io_failure("could not create data directory", error))?;
    let catalog_path = config.files.data_dir.join("catalog.csv");
    fs::write(&catalog_path, SAMPLE_CATALOG)
        .map_err(|error| io_failure("could not write sample catalog", error))?;

    Ok(format!("sample catalog written to {}", catalog_path.display()))
}
