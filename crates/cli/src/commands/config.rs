use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cotizador_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

/// Prints every effective configuration value with the layer it came from.
/// Secrets are shown only as `<redacted>` or `<unset>`.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file_path = detect_config_path();
    let file_doc = file_path.as_deref().and_then(load_toml);

    let api_key =
        if config.email.sendgrid_api_key.is_some() { "<redacted>" } else { "<unset>" }.to_string();
    let signing_secret = if config.files.signing_secret.expose_secret().is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
    .to_string();

    let rows: Vec<(&str, String, &str)> = vec![
        ("database.url", config.database.url.clone(), "COTIZADOR_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "COTIZADOR_DATABASE_MAX_CONNECTIONS",
        ),
        ("server.bind_address", config.server.bind_address.clone(), "COTIZADOR_SERVER_BIND_ADDRESS"),
        ("server.port", config.server.port.to_string(), "COTIZADOR_SERVER_PORT"),
        ("server.quote_base_url", config.server.quote_base_url.clone(), "COTIZADOR_QUOTE_BASE_URL"),
        ("pricing.iva_rate", config.pricing.iva_rate.to_string(), "COTIZADOR_IVA_RATE"),
        (
            "pricing.default_deposit_rate",
            config.pricing.default_deposit_rate.to_string(),
            "COTIZADOR_DEFAULT_DEPOSIT_RATE",
        ),
        ("company.name", config.company.name.clone(), "COTIZADOR_COMPANY_NAME"),
        ("email.enabled", config.email.enabled.to_string(), "COTIZADOR_SEND_EMAILS"),
        ("email.sendgrid_api_key", api_key, "COTIZADOR_SENDGRID_API_KEY"),
        ("email.from", config.email.from.clone(), "COTIZADOR_SENDGRID_FROM"),
        ("files.data_dir", config.files.data_dir.display().to_string(), "COTIZADOR_DATA_DIR"),
        ("files.signing_secret", signing_secret, "COTIZADOR_FILE_SIGNING_SECRET"),
        (
            "files.url_ttl_minutes",
            config.files.url_ttl_minutes.to_string(),
            "COTIZADOR_FILE_URL_TTL_MINUTES",
        ),
        ("logging.level", config.logging.level.clone(), "COTIZADOR_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "COTIZADOR_LOGGING_FORMAT"),
    ];

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(rows.into_iter().map(|(key, value, env_var)| {
        let source = field_source(key, env_var, file_doc.as_ref(), file_path.as_deref());
        format!("{key} = {value} ({source})")
    }));
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("cotizador.toml"), PathBuf::from("config/cotizador.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_toml(path: &Path) -> Option<Value> {
    fs::read_to_string(path).ok()?.parse::<Value>().ok()
}

fn field_source(
    key: &str,
    env_var: &str,
    file_doc: Option<&Value>,
    file_path: Option<&Path>,
) -> String {
    if env::var(env_var).map(|value| !value.trim().is_empty()).unwrap_or(false) {
        return format!("env:{env_var}");
    }

    if let (Some(doc), Some(path)) = (file_doc, file_path) {
        if walk_dotted_key(doc, key) {
            return format!("file:{}", path.display());
        }
    }

    "default".to_string()
}

fn walk_dotted_key(doc: &Value, key: &str) -> bool {
    let mut current = doc;
    for part in key.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}
