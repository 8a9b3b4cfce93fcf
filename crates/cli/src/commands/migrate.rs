use crate::commands::{self, CommandResult};

pub fn run() -> CommandResult {
    migrate().unwrap_or_else(|failure| failure)
}

fn migrate() -> Result<CommandResult, CommandResult> {
    let config = commands::load_config("migrate")?;

    commands::block_on("migrate", async {
        let pool = commands::migrated_pool("migrate", &config).await?;
        pool.close().await;
        Ok(())
    })?;

    Ok(CommandResult::success("migrate", "applied pending migrations"))
}
