use sqlx::Row;

use super::{decode_decimal, decode_timestamp, NewQuote, QuoteRepository, QuoteSummary, RepositoryError};
use crate::DbPool;

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn save(&self, quote: NewQuote) -> Result<i64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO quotes (
                quote_id,
                client_id,
                event_type,
                event_date,
                event_location,
                merchandise,
                discount,
                delivery_fee,
                subtotal,
                iva,
                total,
                deposit_total,
                file_name
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&quote.folio)
        .bind(quote.client_id)
        .bind(&quote.event_type)
        .bind(&quote.event_date)
        .bind(&quote.event_location)
        .bind(quote.merchandise.to_string())
        .bind(quote.discount.to_string())
        .bind(quote.delivery_fee.to_string())
        .bind(quote.subtotal.to_string())
        .bind(quote.iva.to_string())
        .bind(quote.total.to_string())
        .bind(quote.deposit_total.to_string())
        .bind(&quote.file_name)
        .fetch_one(&mut *tx)
        .await?;

        let quote_row_id = row.get::<i64, _>("id");

        for item in &quote.items {
            sqlx::query(
                "INSERT INTO quote_items (
                    quote_row_id,
                    sku,
                    name,
                    qty,
                    days,
                    daily_price,
                    subtotal,
                    excluded
                 ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(quote_row_id)
            .bind(&item.sku)
            .bind(&item.name)
            .bind(i64::from(item.qty))
            .bind(i64::from(item.days))
            .bind(item.daily_price.to_string())
            .bind(item.subtotal.to_string())
            .bind(i64::from(item.excluded))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(quote_row_id)
    }

    async fn find_by_folio(&self, folio: &str) -> Result<Option<QuoteSummary>, RepositoryError> {
        let row = sqlx::query(
            "SELECT quote_id, event_type, total, file_name, created_at
             FROM quotes
             WHERE quote_id = ?",
        )
        .bind(folio)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(QuoteSummary {
                folio: row.get::<String, _>("quote_id"),
                event_type: row.get::<String, _>("event_type"),
                total: decode_decimal("total", &row.get::<String, _>("total"))?,
                file_name: row.get::<String, _>("file_name"),
                created_at: decode_timestamp("created_at", &row.get::<String, _>("created_at"))?,
            })
        })
        .transpose()
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM quotes").fetch_one(&self.pool).await?;
        Ok(row.get::<i64, _>("count"))
    }
}
