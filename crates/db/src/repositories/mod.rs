use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use cotizador_core::domain::client::ClientInfo;
use cotizador_core::pricing::QuoteTotals;

pub mod client;
pub mod folio;
pub mod memory;
pub mod quote;

pub use client::SqlClientRepository;
pub use folio::SqlFolioSequence;
pub use memory::{InMemoryClientRepository, InMemoryQuoteRepository};
pub use quote::SqlQuoteRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Row captured for every priced item so stored quotes can be audited
/// without re-running the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewQuoteItem {
    pub sku: String,
    pub name: String,
    pub qty: u32,
    pub days: u32,
    pub daily_price: Decimal,
    pub subtotal: Decimal,
    pub excluded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewQuote {
    pub folio: String,
    pub client_id: Option<i64>,
    pub event_type: String,
    pub event_date: String,
    pub event_location: String,
    pub merchandise: Decimal,
    pub discount: Decimal,
    pub delivery_fee: Decimal,
    pub subtotal: Decimal,
    pub iva: Decimal,
    pub total: Decimal,
    pub deposit_total: Decimal,
    pub file_name: String,
    pub items: Vec<NewQuoteItem>,
}

impl NewQuote {
    pub fn from_totals(
        folio: &str,
        client_id: Option<i64>,
        client: &ClientInfo,
        totals: &QuoteTotals,
        file_name: &str,
    ) -> Self {
        Self {
            folio: folio.to_string(),
            client_id,
            event_type: client.event_type.clone(),
            event_date: client.event_date.clone(),
            event_location: client.event_location.clone(),
            merchandise: totals.merchandise,
            discount: totals.discount,
            delivery_fee: totals.delivery_fee,
            subtotal: totals.subtotal,
            iva: totals.iva,
            total: totals.total,
            deposit_total: totals.deposit_total,
            file_name: file_name.to_string(),
            items: totals
                .lines
                .iter()
                .map(|line| NewQuoteItem {
                    sku: line.sku.clone(),
                    name: line.name.clone(),
                    qty: line.qty,
                    days: line.days,
                    daily_price: line.daily_price,
                    subtotal: line.subtotal,
                    excluded: line.excluded,
                })
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteSummary {
    pub folio: String,
    pub event_type: String,
    pub total: Decimal,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Returns the id of the matching client row, inserting one when the
    /// exact combination has not been seen before.
    async fn upsert(&self, client: &ClientInfo) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn save(&self, quote: NewQuote) -> Result<i64, RepositoryError>;
    async fn find_by_folio(&self, folio: &str) -> Result<Option<QuoteSummary>, RepositoryError>;
    async fn count(&self) -> Result<i64, RepositoryError>;
}

pub(crate) fn decode_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    value.trim().parse::<Decimal>().map_err(|err| {
        RepositoryError::Decode(format!("column `{column}` holds a non-decimal value: {err}"))
    })
}

pub(crate) fn decode_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|err| {
            RepositoryError::Decode(format!("column `{column}` holds a non-timestamp value: {err}"))
        })
}
