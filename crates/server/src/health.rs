use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use cotizador_db::DbPool;

use crate::bootstrap::AppState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: Readiness,
    pub database: Readiness,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_detail: Option<String>,
    pub catalog_products: usize,
    pub email_enabled: bool,
    pub checked_at: DateTime<Utc>,
}

/// Readiness probe: the service is degraded when the database stops
/// answering. Catalog size and email enablement are informational.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (database, database_detail) = match probe_database(&state.db_pool).await {
        Ok(()) => (Readiness::Ready, None),
        Err(detail) => (Readiness::Degraded, Some(detail)),
    };

    let payload = HealthResponse {
        status: database,
        database,
        database_detail,
        catalog_products: state.catalog.read().await.len(),
        email_enabled: state.config.email.enabled,
        checked_at: Utc::now(),
    };

    let code = match payload.status {
        Readiness::Ready => StatusCode::OK,
        Readiness::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(payload))
}

async fn probe_database(pool: &DbPool) -> Result<(), String> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
        .map_err(|error| format!("database query failed: {error}"))
}
