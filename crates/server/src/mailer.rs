//! Outbound quote email through the SendGrid v3 API.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use tera::{Context, Tera};
use tracing::info;

use cotizador_core::config::EmailConfig;

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("email request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("email rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("email template error: {0}")]
    Template(String),
}

pub struct QuoteAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub struct QuoteEmail {
    pub to_name: String,
    pub to_email: String,
    pub folio: String,
    pub event_type: String,
    pub event_date: String,
    pub total_display: String,
    pub attachment: Option<QuoteAttachment>,
}

#[async_trait]
pub trait QuoteMailer: Send + Sync {
    async fn send_quote(&self, email: &QuoteEmail) -> Result<(), MailerError>;
}

pub struct SendGridMailer {
    http: reqwest::Client,
    api_key: SecretString,
    from_email: String,
    from_name: Option<String>,
    bcc: Option<String>,
    calendly_url: Option<String>,
    company_name: String,
    tera: Tera,
}

impl SendGridMailer {
    pub fn new(
        api_key: SecretString,
        email: &EmailConfig,
        company_name: &str,
    ) -> Result<Self, MailerError> {
        let (from_email, from_name) = parse_from_address(&email.from);

        let mut tera = Tera::default();
        tera.add_raw_template(
            "quote_email.html.tera",
            include_str!("../../../templates/email/quote_email.html.tera"),
        )
        .map_err(|err| MailerError::Template(err.to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            from_email,
            from_name,
            bcc: email.bcc.clone(),
            calendly_url: email.calendly_url.clone(),
            company_name: company_name.to_string(),
            tera,
        })
    }

    fn render_body(&self, email: &QuoteEmail) -> Result<String, MailerError> {
        let mut context = Context::new();
        context.insert("client_name", &email.to_name);
        context.insert("folio", &email.folio);
        context.insert("event_type", &email.event_type);
        context.insert("event_date", &email.event_date);
        context.insert("total_display", &email.total_display);
        context.insert("calendly_url", &self.calendly_url);
        context.insert("company_name", &self.company_name);

        self.tera
            .render("quote_email.html.tera", &context)
            .map_err(|err| MailerError::Template(err.to_string()))
    }

    fn payload(&self, email: &QuoteEmail, body: &str) -> serde_json::Value {
        let mut personalization = serde_json::json!({
            "to": [{ "email": email.to_email, "name": email.to_name }],
        });
        if let Some(bcc) = &self.bcc {
            // SendGrid rejects a bcc equal to the recipient address
            if !bcc.eq_ignore_ascii_case(&email.to_email) {
                personalization["bcc"] = serde_json::json!([{ "email": bcc }]);
            }
        }

        let mut from = serde_json::json!({ "email": self.from_email });
        if let Some(name) = &self.from_name {
            from["name"] = serde_json::json!(name);
        }

        let mut payload = serde_json::json!({
            "personalizations": [personalization],
            "from": from,
            "subject": format!(
                "{}, tu cotización de equipo para {}",
                email.to_name, email.event_type
            ),
            "content": [{ "type": "text/html", "value": body }],
        });

        if let Some(attachment) = &email.attachment {
            payload["attachments"] = serde_json::json!([{
                "content": STANDARD.encode(&attachment.bytes),
                "filename": attachment.file_name,
                "type": attachment.content_type,
                "disposition": "attachment",
            }]);
        }

        payload
    }
}

#[async_trait]
impl QuoteMailer for SendGridMailer {
    async fn send_quote(&self, email: &QuoteEmail) -> Result<(), MailerError> {
        let body = self.render_body(email)?;
        let payload = self.payload(email, &body);

        let response = self
            .http
            .post("https://api.sendgrid.com/v3/mail/send")
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Rejected { status: status.as_u16(), body });
        }

        info!(
            event_name = "quote.email.sent",
            folio = %email.folio,
            to = %email.to_email,
            "quote email accepted by sendgrid"
        );
        Ok(())
    }
}

/// Mailer used when outbound email is disabled; quote creation still works.
#[derive(Default)]
pub struct NoopMailer;

#[async_trait]
impl QuoteMailer for NoopMailer {
    async fn send_quote(&self, email: &QuoteEmail) -> Result<(), MailerError> {
        info!(
            event_name = "quote.email.skipped",
            folio = %email.folio,
            to = %email.to_email,
            "email sending disabled, quote stored without notification"
        );
        Ok(())
    }
}

/// Splits `Name <mail@host>` into address and optional display name.
fn parse_from_address(from: &str) -> (String, Option<String>) {
    if let Some((name, rest)) = from.split_once('<') {
        if let Some(address) = rest.strip_suffix('>') {
            let name = name.trim();
            let display = (!name.is_empty()).then(|| name.to_string());
            return (address.trim().to_string(), display);
        }
    }
    (from.trim().to_string(), None)
}

#[cfg(test)]
mod tests {
    use cotizador_core::config::AppConfig;

    use super::{parse_from_address, QuoteEmail, SendGridMailer};

    fn email() -> QuoteEmail {
        QuoteEmail {
            to_name: "Ana".to_string(),
            to_email: "ana@example.com".to_string(),
            folio: "C-100".to_string(),
            event_type: "Corporativo".to_string(),
            event_date: "2026-10-15".to_string(),
            total_display: "$5,568.00".to_string(),
            attachment: None,
        }
    }

    #[test]
    fn from_address_with_display_name_is_split() {
        let (address, name) = parse_from_address("Medio Angular <cotizacion@medioangular.com>");
        assert_eq!(address, "cotizacion@medioangular.com");
        assert_eq!(name.as_deref(), Some("Medio Angular"));

        let (bare, none) = parse_from_address("ventas@example.com");
        assert_eq!(bare, "ventas@example.com");
        assert!(none.is_none());
    }

    #[test]
    fn payload_carries_subject_body_and_skips_self_bcc() {
        let mut config = AppConfig::default().email;
        config.bcc = Some("ana@example.com".to_string());
        let mailer = SendGridMailer::new("SG.test-key".to_owned().into(), &config, "Medio Angular")
            .expect("mailer");

        let message = email();
        let body = mailer.render_body(&message).expect("body");
        assert!(body.contains("C-100"));
        assert!(body.contains("$5,568.00"));

        let payload = mailer.payload(&message, &body);
        assert_eq!(
            payload["subject"],
            serde_json::json!("Ana, tu cotización de equipo para Corporativo")
        );
        // bcc equal to the recipient must be dropped
        assert!(payload["personalizations"][0].get("bcc").is_none());
        assert!(payload.get("attachments").is_none());
    }

    #[test]
    fn payload_attaches_the_rendered_quote() {
        let config = AppConfig::default().email;
        let mailer = SendGridMailer::new("SG.test-key".to_owned().into(), &config, "Medio Angular")
            .expect("mailer");

        let mut message = email();
        message.attachment = Some(super::QuoteAttachment {
            file_name: "C-100.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.4".to_vec(),
        });

        let payload = mailer.payload(&message, "<html></html>");
        assert_eq!(payload["attachments"][0]["filename"], serde_json::json!("C-100.pdf"));
        assert_eq!(payload["attachments"][0]["disposition"], serde_json::json!("attachment"));
    }
}
