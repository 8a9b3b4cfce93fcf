use sqlx::Row;

use cotizador_core::folio::{FolioError, FolioSequence};

use crate::DbPool;

/// Database-backed folio counter. A single-row `UPDATE ... RETURNING` keeps
/// the increment atomic across concurrent quote requests.
pub struct SqlFolioSequence {
    pool: DbPool,
}

impl SqlFolioSequence {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl FolioSequence for SqlFolioSequence {
    async fn next(&self) -> Result<i64, FolioError> {
        let row = sqlx::query("UPDATE folio_sequence SET last = last + 1 WHERE id = 1 RETURNING last")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| FolioError::Unavailable(err.to_string()))?;

        Ok(row.get::<i64, _>("last"))
    }
}
