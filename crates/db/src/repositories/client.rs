use sqlx::Row;

use cotizador_core::domain::client::ClientInfo;

use super::{ClientRepository, RepositoryError};
use crate::DbPool;

pub struct SqlClientRepository {
    pool: DbPool,
}

impl SqlClientRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ClientRepository for SqlClientRepository {
    async fn upsert(&self, client: &ClientInfo) -> Result<i64, RepositoryError> {
        // UNIQUE does not collapse NULLs in sqlite, so match with IFNULL
        // instead of relying on the constraint.
        let existing = sqlx::query(
            "SELECT id FROM clients
             WHERE name = ?
               AND email = ?
               AND IFNULL(company, '') = IFNULL(?, '')
               AND IFNULL(phone, '') = IFNULL(?, '')",
        )
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.company)
        .bind(&client.phone)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = existing {
            return Ok(row.get::<i64, _>("id"));
        }

        let inserted = sqlx::query(
            "INSERT INTO clients (name, email, company, phone)
             VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.company)
        .bind(&client.phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted.get::<i64, _>("id"))
    }
}
