use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cotizador_core::catalog::loader;
use cotizador_core::domain::client::ClientInfo;
use cotizador_core::domain::quote::{DiscountApplyTo, QuoteInput, RequestedItem};
use cotizador_core::errors::{ApplicationError, InterfaceError};
use cotizador_core::folio::next_folio;
use cotizador_core::money::format_mxn;
use cotizador_core::pricing::{PricingEngine, QuoteTotals};
use cotizador_core::signing::{is_safe_file_name, LinkError};
use cotizador_db::NewQuote;

use crate::bootstrap::AppState;
use crate::health;
use crate::mailer::{QuoteAttachment, QuoteEmail};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/catalog", get(list_catalog))
        .route("/catalog/reload", post(reload_catalog))
        .route("/quotes", post(create_quote))
        .route("/pdf/{file}", get(serve_quote_file))
        .fallback(not_found)
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

type ApiFailure = (StatusCode, Json<ApiError>);

fn interface_failure(error: InterfaceError) -> ApiFailure {
    match error {
        InterfaceError::BadRequest { message, correlation_id } => {
            (StatusCode::BAD_REQUEST, Json(ApiError { error: message, correlation_id }))
        }
        InterfaceError::ServiceUnavailable { message, correlation_id } => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(ApiError { error: message, correlation_id }))
        }
        InterfaceError::Internal { message, correlation_id } => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError { error: message, correlation_id }))
        }
    }
}

fn fail(error: ApplicationError, correlation_id: &str) -> ApiFailure {
    warn!(
        event_name = "quote.request.failed",
        correlation_id,
        error = %error,
        "request rejected"
    );
    interface_failure(error.into_interface(correlation_id))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientPayload {
    name: String,
    email: String,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    event_type: String,
    event_date: String,
    event_location: String,
}

impl ClientPayload {
    fn into_domain(self) -> ClientInfo {
        ClientInfo {
            name: self.name,
            email: self.email,
            company: self.company.filter(|value| !value.trim().is_empty()),
            phone: self.phone.filter(|value| !value.trim().is_empty()),
            event_type: self.event_type,
            event_date: self.event_date,
            event_location: self.event_location,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemPayload {
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    name: Option<String>,
    qty: u32,
    days: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest {
    client: ClientPayload,
    items: Vec<ItemPayload>,
    #[serde(default)]
    discount_rate: Decimal,
    #[serde(default)]
    discount_fixed: Decimal,
    #[serde(default)]
    discount_apply_to: Option<DiscountApplyTo>,
    #[serde(default)]
    delivery_fee: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    quote_id: String,
    totals: QuoteTotals,
    pdf_url: String,
    email_sent: bool,
}

async fn create_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiFailure> {
    let correlation_id = uuid::Uuid::new_v4().to_string();

    let QuoteRequest { client, items, discount_rate, discount_fixed, discount_apply_to, delivery_fee } =
        request;

    let client = client.into_domain();
    client
        .validate()
        .map_err(|err| fail(ApplicationError::Domain(err), &correlation_id))?;

    let input = QuoteInput {
        items: items
            .into_iter()
            .map(|item| RequestedItem { sku: item.sku, name: item.name, qty: item.qty, days: item.days })
            .collect(),
        discount_rate,
        discount_fixed,
        discount_apply_to: discount_apply_to.unwrap_or_default(),
        delivery_fee,
    };

    let catalog = state.catalog.read().await.clone();
    let totals = state
        .engine
        .price(&catalog, &input)
        .map_err(|err| fail(ApplicationError::Domain(err), &correlation_id))?;

    let folio = next_folio(state.folios.as_ref(), &client.event_type)
        .await
        .map_err(|err| fail(ApplicationError::Persistence(err.to_string()), &correlation_id))?;

    let rendered = state
        .renderer
        .render_and_store(&folio, &client, &totals, &state.config.company)
        .await
        .map_err(|err| fail(ApplicationError::Integration(err.to_string()), &correlation_id))?;

    let client_id = state
        .clients
        .upsert(&client)
        .await
        .map_err(|err| fail(ApplicationError::Persistence(err.to_string()), &correlation_id))?;

    let record =
        NewQuote::from_totals(&folio, Some(client_id), &client, &totals, &rendered.file_name);
    state
        .quotes
        .save(record)
        .await
        .map_err(|err| fail(ApplicationError::Persistence(err.to_string()), &correlation_id))?;

    // Email delivery is best effort; a stored quote is never rolled back
    // because the notification bounced.
    let email_sent = if state.config.email.enabled {
        let message = QuoteEmail {
            to_name: client.name.clone(),
            to_email: client.email.clone(),
            folio: folio.clone(),
            event_type: client.event_type.clone(),
            event_date: client.event_date.clone(),
            total_display: format_mxn(totals.total),
            attachment: Some(QuoteAttachment {
                file_name: rendered.file_name.clone(),
                content_type: rendered.content_type.to_string(),
                bytes: rendered.bytes.clone(),
            }),
        };
        match state.mailer.send_quote(&message).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    event_name = "quote.email.failed",
                    quote_id = %folio,
                    correlation_id = %correlation_id,
                    error = %err,
                    "quote stored but email delivery failed"
                );
                false
            }
        }
    } else {
        false
    };

    let pdf_url = signed_file_url(&state, &rendered.file_name);

    info!(
        event_name = "quote.created",
        quote_id = %folio,
        correlation_id = %correlation_id,
        total = %totals.total,
        email_sent,
        "quote created"
    );

    Ok(Json(QuoteResponse { quote_id: folio, totals, pdf_url, email_sent }))
}

fn signed_file_url(state: &AppState, file_name: &str) -> String {
    let ttl_ms = state.config.files.url_ttl_minutes as i64 * 60_000;
    let expires_at_ms = Utc::now().timestamp_millis() + ttl_ms;
    let signature = state.signer.sign(file_name, expires_at_ms);
    format!(
        "{}/pdf/{file_name}?exp={expires_at_ms}&sig={signature}",
        state.config.server.quote_base_url.trim_end_matches('/')
    )
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub sig: Option<String>,
}

async fn serve_quote_file(
    Path(file): Path<String>,
    Query(query): Query<FileQuery>,
    State(state): State<AppState>,
) -> Result<Response, ApiFailure> {
    let reject = |status: StatusCode, message: &str| {
        (
            status,
            Json(ApiError { error: message.to_string(), correlation_id: "file-access".to_string() }),
        )
    };

    if !is_safe_file_name(&file) {
        return Err(reject(StatusCode::BAD_REQUEST, "invalid file name"));
    }

    let (Some(expires_at_ms), Some(signature)) = (query.exp, query.sig.as_deref()) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing exp or sig"));
    };

    match state.signer.verify(&file, expires_at_ms, signature, Utc::now().timestamp_millis()) {
        Ok(()) => {}
        Err(LinkError::Expired) => {
            return Err(reject(StatusCode::GONE, "link expired, request the quote again"));
        }
        Err(LinkError::InvalidSignature) => {
            return Err(reject(StatusCode::FORBIDDEN, "invalid signature"));
        }
    }

    let path = state.quotes_dir().join(&file);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| reject(StatusCode::NOT_FOUND, "quote file not found"))?;

    let content_type = if file.ends_with(".pdf") {
        "application/pdf"
    } else {
        "text/html; charset=utf-8"
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "private, no-store")
        .header(header::CONTENT_DISPOSITION, format!("inline; filename=\"{file}\""))
        .body(Body::from(bytes))
        .unwrap())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiProduct {
    sku: String,
    name: String,
    category: String,
    section: String,
    description: String,
    image_url: String,
    daily_price: Decimal,
    deposit_rate: Decimal,
    discountable: bool,
}

#[derive(Debug, Serialize)]
struct CatalogResponse {
    products: Vec<ApiProduct>,
    count: usize,
}

async fn list_catalog(State(state): State<AppState>) -> Json<CatalogResponse> {
    let catalog = state.catalog.read().await.clone();
    let products: Vec<ApiProduct> = catalog
        .products()
        .iter()
        .map(|product| ApiProduct {
            sku: product.sku.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            section: product.section.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            daily_price: product.daily_price,
            deposit_rate: product.deposit_rate,
            discountable: product.discountable,
        })
        .collect();
    let count = products.len();

    Json(CatalogResponse { products, count })
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    products: usize,
}

async fn reload_catalog(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiFailure> {
    let correlation_id = uuid::Uuid::new_v4().to_string();

    let catalog = loader::load_from_dir(
        &state.config.files.data_dir,
        state.config.pricing.default_deposit_rate,
    )
    .map_err(|err| fail(ApplicationError::Integration(err.to_string()), &correlation_id))?;

    let count = catalog.len();
    *state.catalog.write().await = Arc::new(catalog);

    info!(
        event_name = "catalog.reloaded",
        correlation_id = %correlation_id,
        products = count,
        "catalog reloaded"
    );

    Ok(Json(ReloadResponse { products: count }))
}

async fn not_found() -> ApiFailure {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError { error: "not found".to_string(), correlation_id: "router".to_string() }),
    )
}

#[cfg(test)]
pub mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::Json;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tempfile::TempDir;
    use tokio::sync::RwLock;

    use cotizador_core::catalog::Catalog;
    use cotizador_core::config::AppConfig;
    use cotizador_core::domain::product::Product;
    use cotizador_core::pricing::DeterministicPricingEngine;
    use cotizador_core::signing::FileLinkSigner;
    use cotizador_db::repositories::SqlFolioSequence;
    use cotizador_db::{
        connect_with_settings, migrations, QuoteRepository, SqlClientRepository, SqlQuoteRepository,
    };

    use crate::bootstrap::AppState;
    use crate::mailer::NoopMailer;
    use crate::pdf::QuoteRenderer;

    use super::{
        create_quote, list_catalog, reload_catalog, serve_quote_file, FileQuery, QuoteRequest,
    };

    fn product(sku: &str, name: &str, category: &str, price: i64) -> Product {
        Product {
            sku: sku.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            section: String::new(),
            description: String::new(),
            image_url: String::new(),
            daily_price: Decimal::new(price, 0),
            deposit_rate: Decimal::ZERO,
            active: true,
            discountable: true,
        }
    }

    pub async fn test_state() -> (AppState, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let url = format!(
            "sqlite:file:{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4().simple()
        );
        let pool = connect_with_settings(&url, 1, 5).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let mut config = AppConfig::default();
        config.files.data_dir = dir.path().to_path_buf();
        let signer = FileLinkSigner::new(config.files.signing_secret.clone());

        let catalog = Catalog::new(vec![
            product("SILLA-01", "Silla plegable", "Mobiliario", 25),
            product("MESA-01", "Mesa redonda", "Mobiliario", 120),
            product("MESERO-01", "Mesero", "Personal", 600),
        ]);

        let renderer = QuoteRenderer::html_only(dir.path().join("quotes")).expect("renderer");

        let state = AppState {
            config: Arc::new(config),
            db_pool: pool.clone(),
            catalog: Arc::new(RwLock::new(Arc::new(catalog))),
            engine: Arc::new(DeterministicPricingEngine::default()),
            clients: Arc::new(SqlClientRepository::new(pool.clone())),
            quotes: Arc::new(SqlQuoteRepository::new(pool.clone())),
            folios: Arc::new(SqlFolioSequence::new(pool)),
            signer,
            renderer: Arc::new(renderer),
            mailer: Arc::new(NoopMailer),
        };

        (state, dir)
    }

    fn request(value: serde_json::Value) -> QuoteRequest {
        serde_json::from_value(value).expect("valid quote request")
    }

    fn base_request() -> serde_json::Value {
        serde_json::json!({
            "client": {
                "name": "Ana Torres",
                "email": "ana@example.com",
                "eventType": "Corporativo",
                "eventDate": "2026-10-15",
                "eventLocation": "Polanco, CDMX"
            },
            "items": [
                { "sku": "SILLA-01", "qty": 10, "days": 3 }
            ],
            "deliveryFee": 150
        })
    }

    #[tokio::test]
    async fn create_quote_prices_stores_and_links_the_file() {
        let (state, dir) = test_state().await;

        let Json(response) = create_quote(State(state.clone()), Json(request(base_request())))
            .await
            .expect("quote should be created");

        assert_eq!(response.quote_id, "C-100");
        assert!(!response.email_sent);
        // 10 chairs * 25 * 3 days = 750, 20% tier discount = 150
        assert_eq!(response.totals.merchandise, Decimal::new(750, 0));
        assert_eq!(response.totals.discount, Decimal::new(150, 0));
        assert!(response.pdf_url.contains("/pdf/C-100.html?exp="));
        assert!(response.pdf_url.contains("&sig="));
        assert!(dir.path().join("quotes/C-100.html").exists());

        assert_eq!(state.quotes.count().await.expect("count"), 1);
        let stored = state
            .quotes
            .find_by_folio("C-100")
            .await
            .expect("lookup")
            .expect("stored quote");
        assert_eq!(stored.file_name, "C-100.html");
        assert_eq!(stored.total, response.totals.total);
    }

    #[tokio::test]
    async fn unknown_skus_reject_the_whole_request() {
        let (state, _dir) = test_state().await;

        let mut payload = base_request();
        payload["items"] = serde_json::json!([
            { "sku": "SILLA-01", "qty": 1, "days": 1 },
            { "sku": "SKU-404", "qty": 1, "days": 1 }
        ]);

        let (status, Json(error)) = create_quote(State(state.clone()), Json(request(payload)))
            .await
            .expect_err("unknown sku should fail");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(error.error.contains("SKU-404"));
        assert_eq!(state.quotes.count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn invalid_client_is_rejected_before_pricing() {
        let (state, _dir) = test_state().await;

        let mut payload = base_request();
        payload["client"]["email"] = serde_json::json!("not-an-email");

        let (status, _) = create_quote(State(state), Json(request(payload)))
            .await
            .expect_err("invalid email should fail");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn quote_files_are_served_only_with_a_valid_fresh_signature() {
        let (state, dir) = test_state().await;

        let quotes_dir = dir.path().join("quotes");
        tokio::fs::create_dir_all(&quotes_dir).await.expect("mkdir");
        tokio::fs::write(quotes_dir.join("C-9.html"), "<html>C-9</html>").await.expect("write");

        let exp = Utc::now().timestamp_millis() + 60_000;
        let sig = state.signer.sign("C-9.html", exp);

        let response = serve_quote_file(
            Path("C-9.html".to_string()),
            Query(FileQuery { exp: Some(exp), sig: Some(sig.clone()) }),
            State(state.clone()),
        )
        .await
        .expect("valid link should serve the file");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("cache-control").and_then(|v| v.to_str().ok()),
            Some("private, no-store")
        );

        let (status, _) = serve_quote_file(
            Path("C-9.html".to_string()),
            Query(FileQuery { exp: Some(exp), sig: Some("tampered".to_string()) }),
            State(state.clone()),
        )
        .await
        .expect_err("bad signature must be rejected");
        assert_eq!(status, StatusCode::FORBIDDEN);

        let stale_exp = Utc::now().timestamp_millis() - 1_000;
        let stale_sig = state.signer.sign("C-9.html", stale_exp);
        let (status, _) = serve_quote_file(
            Path("C-9.html".to_string()),
            Query(FileQuery { exp: Some(stale_exp), sig: Some(stale_sig) }),
            State(state.clone()),
        )
        .await
        .expect_err("expired link must be rejected");
        assert_eq!(status, StatusCode::GONE);

        let (status, _) = serve_quote_file(
            Path("C-9.html".to_string()),
            Query(FileQuery { exp: None, sig: None }),
            State(state.clone()),
        )
        .await
        .expect_err("unsigned request must be rejected");
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = serve_quote_file(
            Path("../secrets.txt".to_string()),
            Query(FileQuery { exp: Some(exp), sig: Some(sig) }),
            State(state),
        )
        .await
        .expect_err("path traversal must be rejected");
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_files_return_not_found_even_when_signed() {
        let (state, _dir) = test_state().await;

        let exp = Utc::now().timestamp_millis() + 60_000;
        let sig = state.signer.sign("C-404.pdf", exp);

        let (status, _) = serve_quote_file(
            Path("C-404.pdf".to_string()),
            Query(FileQuery { exp: Some(exp), sig: Some(sig) }),
            State(state),
        )
        .await
        .expect_err("missing file should 404");
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn catalog_listing_and_reload_swap_the_snapshot() {
        let (state, dir) = test_state().await;

        let Json(listing) = list_catalog(State(state.clone())).await;
        assert_eq!(listing.count, 3);
        assert!(listing.products.iter().any(|p| p.sku == "MESA-01"));

        tokio::fs::write(
            dir.path().join("catalog.csv"),
            "sku,name,category,price\nTARIMA-01,Tarima 2x1,Escenario,350\n",
        )
        .await
        .expect("write catalog");

        let Json(reloaded) = reload_catalog(State(state.clone()))
            .await
            .expect("reload should succeed");
        assert_eq!(reloaded.products, 1);

        let Json(listing) = list_catalog(State(state)).await;
        assert_eq!(listing.count, 1);
        assert_eq!(listing.products[0].sku, "TARIMA-01");
    }
}
