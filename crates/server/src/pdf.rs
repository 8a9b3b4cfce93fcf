//! Quote rendering: HTML via Tera, converted to PDF with wkhtmltopdf when the
//! binary is on PATH, otherwise stored as HTML for browser printing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use rust_decimal::Decimal;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{info, warn};

use cotizador_core::config::CompanyConfig;
use cotizador_core::domain::client::ClientInfo;
use cotizador_core::money::format_mxn;
use cotizador_core::pricing::QuoteTotals;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(String),
    #[error("pdf conversion error: {0}")]
    Conversion(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Amounts travel through the template context as decimal strings; `money`
/// turns them into `$1,234.56`.
pub fn register_template_filters(tera: &mut Tera) {
    tera.register_filter("money", tera_money_filter);
}

fn tera_money_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let amount = match value {
        tera::Value::String(text) => text
            .parse::<Decimal>()
            .map_err(|err| tera::Error::msg(format!("money filter got a non-decimal: {err}")))?,
        tera::Value::Number(number) => {
            let float = number.as_f64().unwrap_or(0.0);
            Decimal::try_from(float)
                .map_err(|err| tera::Error::msg(format!("money filter got a bad number: {err}")))?
        }
        _ => return Err(tera::Error::msg("money filter expects a string or number")),
    };

    Ok(tera::Value::String(format_mxn(amount)))
}

pub struct RenderedQuote {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

pub struct QuoteRenderer {
    tera: Tera,
    wkhtmltopdf_path: Option<PathBuf>,
    output_dir: PathBuf,
}

impl QuoteRenderer {
    pub fn new(output_dir: PathBuf) -> Result<Self, RenderError> {
        let wkhtmltopdf_path = which::which("wkhtmltopdf").ok();
        match &wkhtmltopdf_path {
            Some(path) => info!(path = %path.display(), "wkhtmltopdf found, quotes render as PDF"),
            None => warn!("wkhtmltopdf not found in PATH, quotes render as HTML"),
        }

        Self::with_converter(output_dir, wkhtmltopdf_path)
    }

    /// HTML-only renderer, independent of what is installed on the host.
    pub fn html_only(output_dir: PathBuf) -> Result<Self, RenderError> {
        Self::with_converter(output_dir, None)
    }

    fn with_converter(
        output_dir: PathBuf,
        wkhtmltopdf_path: Option<PathBuf>,
    ) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            "quote.html.tera",
            include_str!("../../../templates/quote.html.tera"),
        )
        .map_err(|err| RenderError::Template(err.to_string()))?;
        register_template_filters(&mut tera);

        Ok(Self { tera, wkhtmltopdf_path, output_dir })
    }

    /// Renders the quote and persists it under the output directory as
    /// `<folio>.pdf` or `<folio>.html`.
    pub async fn render_and_store(
        &self,
        folio: &str,
        client: &ClientInfo,
        totals: &QuoteTotals,
        company: &CompanyConfig,
    ) -> Result<RenderedQuote, RenderError> {
        let html = self.render_html(folio, client, totals, company)?;

        let rendered = if let Some(wkhtmltopdf) = &self.wkhtmltopdf_path {
            match convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(bytes) => RenderedQuote {
                    file_name: format!("{folio}.pdf"),
                    bytes,
                    content_type: "application/pdf",
                },
                Err(err) => {
                    warn!(error = %err, folio, "pdf conversion failed, storing html instead");
                    html_result(folio, html)
                }
            }
        } else {
            html_result(folio, html)
        };

        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(self.output_dir.join(&rendered.file_name), &rendered.bytes).await?;

        Ok(rendered)
    }

    fn render_html(
        &self,
        folio: &str,
        client: &ClientInfo,
        totals: &QuoteTotals,
        company: &CompanyConfig,
    ) -> Result<String, RenderError> {
        let mut context = Context::new();
        context.insert("folio", folio);
        context.insert("created_at", &chrono::Utc::now().format("%d/%m/%Y").to_string());
        context.insert("client", client);
        context.insert("company", &serde_json::json!({
            "name": company.name,
            "email": company.email,
            "phone": company.phone,
            "website": company.website,
        }));
        context.insert(
            "lines",
            &totals
                .lines
                .iter()
                .map(|line| {
                    serde_json::json!({
                        "qty": line.qty,
                        "name": line.name,
                        "days": line.days,
                        "daily_price": line.daily_price.to_string(),
                        "subtotal": line.subtotal.to_string(),
                        "excluded": line.excluded,
                    })
                })
                .collect::<Vec<_>>(),
        );
        context.insert("totals", &serde_json::json!({
            "merchandise": totals.merchandise.to_string(),
            "discount": totals.discount.to_string(),
            "delivery_fee": totals.delivery_fee.to_string(),
            "subtotal": totals.subtotal.to_string(),
            "iva": totals.iva.to_string(),
            "total": totals.total.to_string(),
            "deposit_total": totals.deposit_total.to_string(),
        }));
        context.insert("has_delivery_fee", &(totals.delivery_fee > Decimal::ZERO));
        context.insert("has_deposit", &(totals.deposit_total > Decimal::ZERO));
        context.insert(
            "iva_rate_display",
            &format!("{}%", (totals.iva_rate * Decimal::new(100, 0)).normalize()),
        );

        self.tera
            .render("quote.html.tera", &context)
            .map_err(|err| RenderError::Template(err.to_string()))
    }
}

fn html_result(folio: &str, html: String) -> RenderedQuote {
    RenderedQuote {
        file_name: format!("{folio}.html"),
        bytes: html.into_bytes(),
        content_type: "text/html; charset=utf-8",
    }
}

async fn convert_html_to_pdf(
    html: &str,
    wkhtmltopdf_path: &std::path::Path,
) -> Result<Vec<u8>, RenderError> {
    let temp_dir = std::env::temp_dir();
    let html_path = temp_dir.join(format!("cotizacion_{}.html", uuid::Uuid::new_v4()));
    let pdf_path = temp_dir.join(format!("cotizacion_{}.pdf", uuid::Uuid::new_v4()));

    tokio::fs::write(&html_path, html).await?;

    let output = Command::new(wkhtmltopdf_path)
        .arg("--page-size")
        .arg("Letter")
        .arg("--margin-top")
        .arg("10mm")
        .arg("--margin-bottom")
        .arg("10mm")
        .arg("--margin-left")
        .arg("10mm")
        .arg("--margin-right")
        .arg("10mm")
        .arg("--encoding")
        .arg("utf-8")
        .arg(&html_path)
        .arg(&pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let _ = tokio::fs::remove_file(&html_path).await;
        return Err(RenderError::Conversion(stderr));
    }

    let bytes = tokio::fs::read(&pdf_path).await?;

    let _ = tokio::fs::remove_file(&html_path).await;
    let _ = tokio::fs::remove_file(&pdf_path).await;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use cotizador_core::catalog::Catalog;
    use cotizador_core::config::AppConfig;
    use cotizador_core::domain::client::ClientInfo;
    use cotizador_core::domain::product::Product;
    use cotizador_core::domain::quote::{DiscountApplyTo, QuoteInput, RequestedItem};
    use cotizador_core::pricing::{price_quote, PricingSettings};

    use super::QuoteRenderer;

    fn client() -> ClientInfo {
        ClientInfo {
            name: "Ana Torres".to_string(),
            email: "ana@example.com".to_string(),
            company: None,
            phone: None,
            event_type: "Social".to_string(),
            event_date: "2026-09-12".to_string(),
            event_location: "Coyoacán, CDMX".to_string(),
        }
    }

    fn totals() -> cotizador_core::pricing::QuoteTotals {
        let catalog = Catalog::new(vec![Product {
            sku: "MESA-01".to_string(),
            name: "Mesa redonda".to_string(),
            category: "Mobiliario".to_string(),
            section: String::new(),
            description: String::new(),
            image_url: String::new(),
            daily_price: Decimal::new(120, 0),
            deposit_rate: Decimal::ZERO,
            active: true,
            discountable: true,
        }]);
        let input = QuoteInput {
            items: vec![RequestedItem {
                sku: Some("MESA-01".to_string()),
                name: None,
                qty: 4,
                days: 2,
            }],
            discount_rate: Decimal::ZERO,
            discount_fixed: Decimal::ZERO,
            discount_apply_to: DiscountApplyTo::Discountable,
            delivery_fee: Decimal::new(200, 0),
        };
        price_quote(&catalog, &input, PricingSettings::default()).expect("price")
    }

    #[tokio::test]
    async fn html_renderer_stores_a_quote_file_with_formatted_amounts() {
        let dir = TempDir::new().expect("temp dir");
        let renderer = QuoteRenderer::html_only(dir.path().to_path_buf()).expect("renderer");
        let company = AppConfig::default().company;

        let rendered = renderer
            .render_and_store("S-100", &client(), &totals(), &company)
            .await
            .expect("render");

        assert_eq!(rendered.file_name, "S-100.html");
        let html = String::from_utf8(rendered.bytes).expect("utf8");
        assert!(html.contains("S-100"));
        assert!(html.contains("Ana Torres"));
        assert!(html.contains("Mesa redonda"));
        // 4 * 120 * 2 days with the 2-day tier applied downstream
        assert!(html.contains("IVA (16%)"));
        assert!(dir.path().join("S-100.html").exists());
    }

    #[tokio::test]
    async fn delivery_fee_row_is_omitted_when_zero() {
        let dir = TempDir::new().expect("temp dir");
        let renderer = QuoteRenderer::html_only(dir.path().to_path_buf()).expect("renderer");
        let company = AppConfig::default().company;

        let mut no_fee = totals();
        no_fee.delivery_fee = Decimal::ZERO;
        no_fee.subtotal = no_fee.merchandise - no_fee.discount;

        let rendered = renderer
            .render_and_store("S-101", &client(), &no_fee, &company)
            .await
            .expect("render");

        let html = String::from_utf8(rendered.bytes).expect("utf8");
        assert!(!html.contains("Flete / Entrega"));
    }
}
