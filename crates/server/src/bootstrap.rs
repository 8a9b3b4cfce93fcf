use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

use cotizador_core::catalog::{self, Catalog};
use cotizador_core::config::{AppConfig, ConfigError, LoadOptions};
use cotizador_core::folio::FolioSequence;
use cotizador_core::pricing::{DeterministicPricingEngine, PricingSettings};
use cotizador_core::signing::FileLinkSigner;
use cotizador_db::repositories::SqlFolioSequence;
use cotizador_db::{
    connect_with_settings, migrations, ClientRepository, DbPool, QuoteRepository,
    SqlClientRepository, SqlQuoteRepository,
};

use crate::mailer::{NoopMailer, QuoteMailer, SendGridMailer};
use crate::pdf::{QuoteRenderer, RenderError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: DbPool,
    pub catalog: Arc<RwLock<Arc<Catalog>>>,
    pub engine: Arc<DeterministicPricingEngine>,
    pub clients: Arc<dyn ClientRepository>,
    pub quotes: Arc<dyn QuoteRepository>,
    pub folios: Arc<dyn FolioSequence>,
    pub signer: FileLinkSigner,
    pub renderer: Arc<QuoteRenderer>,
    pub mailer: Arc<dyn QuoteMailer>,
}

impl AppState {
    pub fn quotes_dir(&self) -> PathBuf {
        self.config.files.data_dir.join("quotes")
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("catalog load failed: {0}")]
    Catalog(#[from] catalog::loader::CatalogError),
    #[error("quote renderer failed to initialize: {0}")]
    Renderer(#[from] RenderError),
    #[error("mailer failed to initialize: {0}")]
    Mailer(#[from] crate::mailer::MailerError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<AppState, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<AppState, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let catalog = catalog::loader::load_from_dir(
        &config.files.data_dir,
        config.pricing.default_deposit_rate,
    )?;
    info!(
        event_name = "system.bootstrap.catalog_loaded",
        correlation_id = "bootstrap",
        products = catalog.len(),
        "catalog loaded"
    );

    let engine = DeterministicPricingEngine::new(PricingSettings {
        iva_rate: config.pricing.iva_rate,
        default_deposit_rate: config.pricing.default_deposit_rate,
    });

    let renderer = QuoteRenderer::new(config.files.data_dir.join("quotes"))?;

    let mailer: Arc<dyn QuoteMailer> = match (config.email.enabled, &config.email.sendgrid_api_key)
    {
        (true, Some(api_key)) => {
            Arc::new(SendGridMailer::new(api_key.clone(), &config.email, &config.company.name)?)
        }
        _ => Arc::new(NoopMailer),
    };

    let signer = FileLinkSigner::new(config.files.signing_secret.clone());

    Ok(AppState {
        config: Arc::new(config),
        db_pool: db_pool.clone(),
        catalog: Arc::new(RwLock::new(Arc::new(catalog))),
        engine: Arc::new(engine),
        clients: Arc::new(SqlClientRepository::new(db_pool.clone())),
        quotes: Arc::new(SqlQuoteRepository::new(db_pool.clone())),
        folios: Arc::new(SqlFolioSequence::new(db_pool)),
        signer,
        renderer: Arc::new(renderer),
        mailer,
    })
}
