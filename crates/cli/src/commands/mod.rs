pub mod config;
pub mod doctor;
pub mod migrate;
pub mod price;
pub mod seed;

use std::future::Future;

use cotizador_core::config::{AppConfig, LoadOptions};
use cotizador_db::{connect_with_settings, migrations, DbPool};

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DB: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_IO: u8 = 6;
pub const EXIT_PRICING: u8 = 7;

/// Outcome of a subcommand: what to print and what to exit with. The output
/// of state-changing commands is a single JSON object so wrapper scripts can
/// parse it.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self { exit_code: 0, output: report(command, "ok", None, &message.into()) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self { exit_code, output: report(command, "error", Some(error_class), &message.into()) }
    }
}

fn report(command: &str, status: &str, error_class: Option<&str>, message: &str) -> String {
    let mut doc = serde_json::json!({
        "command": command,
        "status": status,
        "message": message,
    });
    if let Some(class) = error_class {
        doc["error_class"] = serde_json::Value::String(class.to_string());
    }
    doc.to_string()
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

/// Subcommands are synchronous at the clap boundary; database work runs on a
/// throwaway current-thread runtime.
pub(crate) fn block_on<T>(
    command: &str,
    future: impl Future<Output = Result<T, CommandResult>>,
) -> Result<T, CommandResult> {
    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        })?;
    runtime.block_on(future)
}

pub(crate) async fn migrated_pool(
    command: &str,
    config: &AppConfig,
) -> Result<DbPool, CommandResult> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| {
        CommandResult::failure(command, "db_connectivity", error.to_string(), EXIT_DB)
    })?;

    migrations::run_pending(&pool).await.map_err(|error| {
        CommandResult::failure(command, "migration", error.to_string(), EXIT_MIGRATION)
    })?;

    Ok(pool)
}
