use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub pricing: PricingConfig,
    pub company: CompanyConfig,
    pub email: EmailConfig,
    pub files: FilesConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
    pub quote_base_url: String,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub iva_rate: Decimal,
    pub default_deposit_rate: Decimal,
}

#[derive(Clone, Debug)]
pub struct CompanyConfig {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub website: String,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub enabled: bool,
    pub sendgrid_api_key: Option<SecretString>,
    pub from: String,
    pub bcc: Option<String>,
    pub calendly_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FilesConfig {
    pub data_dir: PathBuf,
    pub signing_secret: SecretString,
    pub url_ttl_minutes: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Highest-precedence layer, filled in from CLI flags.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub email_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read `{path}`: {source}")]
    FileRead { path: PathBuf, source: std::io::Error },
    #[error("`{path}` is not valid TOML: {source}")]
    FileParse { path: PathBuf, source: toml::de::Error },
    #[error("config file `{0}` does not exist")]
    MissingConfigFile(PathBuf),
    #[error("`${{{var}}}` references an unset environment variable")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated `${{...}}` interpolation in config file")]
    UnterminatedInterpolation,
    #[error("environment override `{key}` has an unusable value `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://data/cotizador.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 4000,
                graceful_shutdown_secs: 15,
                quote_base_url: "http://localhost:4000".to_string(),
            },
            pricing: PricingConfig {
                iva_rate: Decimal::new(16, 2),
                default_deposit_rate: Decimal::ZERO,
            },
            company: CompanyConfig {
                name: "Medio Angular".to_string(),
                email: "cotizacion@medioangular.com".to_string(),
                phone: "5530997587".to_string(),
                website: "www.medioangular.com".to_string(),
            },
            email: EmailConfig {
                enabled: false,
                sendgrid_api_key: None,
                from: "Medio Angular <cotizacion@medioangular.com>".to_string(),
                bcc: Some("cotizacion@medioangular.com".to_string()),
                calendly_url: None,
            },
            files: FilesConfig {
                data_dir: PathBuf::from("data"),
                signing_secret: "cambia-esto-por-un-secreto-largo-unico-32+chars".to_string().into(),
                url_ttl_minutes: 10_080,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unknown log format `{other}`, expected compact, pretty or json"
            ))),
        }
    }
}

/// Layered load: built-in defaults, then an optional TOML file (with `${VAR}`
/// interpolation), then `COTIZADOR_*` environment variables, then explicit
/// overrides. Later layers win.
impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => config.apply_patch(read_patch(&path)?),
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from("cotizador.toml"));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(db) = patch.database {
            merge(&mut self.database.url, db.url);
            merge(&mut self.database.max_connections, db.max_connections);
            merge(&mut self.database.timeout_secs, db.timeout_secs);
        }
        if let Some(server) = patch.server {
            merge(&mut self.server.bind_address, server.bind_address);
            merge(&mut self.server.port, server.port);
            merge(&mut self.server.graceful_shutdown_secs, server.graceful_shutdown_secs);
            merge(&mut self.server.quote_base_url, server.quote_base_url);
        }
        if let Some(pricing) = patch.pricing {
            merge(&mut self.pricing.iva_rate, pricing.iva_rate);
            merge(&mut self.pricing.default_deposit_rate, pricing.default_deposit_rate);
        }
        if let Some(company) = patch.company {
            merge(&mut self.company.name, company.name);
            merge(&mut self.company.email, company.email);
            merge(&mut self.company.phone, company.phone);
            merge(&mut self.company.website, company.website);
        }
        if let Some(email) = patch.email {
            merge(&mut self.email.enabled, email.enabled);
            merge(
                &mut self.email.sendgrid_api_key,
                email.sendgrid_api_key.map(|key| Some(SecretString::from(key))),
            );
            merge(&mut self.email.from, email.from);
            merge(&mut self.email.bcc, email.bcc.map(Some));
            merge(&mut self.email.calendly_url, email.calendly_url.map(Some));
        }
        if let Some(files) = patch.files {
            merge(&mut self.files.data_dir, files.data_dir.map(PathBuf::from));
            merge(&mut self.files.signing_secret, files.signing_secret.map(SecretString::from));
            merge(&mut self.files.url_ttl_minutes, files.url_ttl_minutes);
        }
        if let Some(logging) = patch.logging {
            merge(&mut self.logging.level, logging.level);
            merge(&mut self.logging.format, logging.format);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        merge(&mut self.database.url, read_env("COTIZADOR_DATABASE_URL"));
        merge(&mut self.database.max_connections, env_parsed("COTIZADOR_DATABASE_MAX_CONNECTIONS")?);
        merge(&mut self.database.timeout_secs, env_parsed("COTIZADOR_DATABASE_TIMEOUT_SECS")?);

        merge(&mut self.server.bind_address, read_env("COTIZADOR_SERVER_BIND_ADDRESS"));
        merge(&mut self.server.port, env_parsed("COTIZADOR_SERVER_PORT")?);
        merge(
            &mut self.server.graceful_shutdown_secs,
            env_parsed("COTIZADOR_SERVER_GRACEFUL_SHUTDOWN_SECS")?,
        );
        merge(&mut self.server.quote_base_url, read_env("COTIZADOR_QUOTE_BASE_URL"));

        merge(&mut self.pricing.iva_rate, env_parsed("COTIZADOR_IVA_RATE")?);
        merge(&mut self.pricing.default_deposit_rate, env_parsed("COTIZADOR_DEFAULT_DEPOSIT_RATE")?);

        merge(&mut self.company.name, read_env("COTIZADOR_COMPANY_NAME"));
        merge(&mut self.company.email, read_env("COTIZADOR_COMPANY_EMAIL"));
        merge(&mut self.company.phone, read_env("COTIZADOR_COMPANY_PHONE"));
        merge(&mut self.company.website, read_env("COTIZADOR_COMPANY_WEBSITE"));

        merge(&mut self.email.enabled, env_parsed("COTIZADOR_SEND_EMAILS")?);
        merge(
            &mut self.email.sendgrid_api_key,
            read_env("COTIZADOR_SENDGRID_API_KEY").map(|key| Some(SecretString::from(key))),
        );
        merge(&mut self.email.from, read_env("COTIZADOR_SENDGRID_FROM"));
        merge(&mut self.email.bcc, read_env("COTIZADOR_SENDGRID_BCC").map(Some));
        merge(&mut self.email.calendly_url, read_env("COTIZADOR_SENDGRID_CALENDLY_URL").map(Some));

        merge(&mut self.files.data_dir, read_env("COTIZADOR_DATA_DIR").map(PathBuf::from));
        merge(
            &mut self.files.signing_secret,
            read_env("COTIZADOR_FILE_SIGNING_SECRET").map(SecretString::from),
        );
        merge(&mut self.files.url_ttl_minutes, env_parsed("COTIZADOR_FILE_URL_TTL_MINUTES")?);

        // COTIZADOR_LOG_LEVEL / COTIZADOR_LOG_FORMAT are accepted as aliases
        merge(
            &mut self.logging.level,
            read_env("COTIZADOR_LOGGING_LEVEL").or_else(|| read_env("COTIZADOR_LOG_LEVEL")),
        );
        if let Some(value) =
            read_env("COTIZADOR_LOGGING_FORMAT").or_else(|| read_env("COTIZADOR_LOG_FORMAT"))
        {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        merge(&mut self.database.url, overrides.database_url);
        merge(&mut self.files.data_dir, overrides.data_dir);
        merge(&mut self.logging.level, overrides.log_level);
        merge(&mut self.email.enabled, overrides.email_enabled);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_pricing(&self.pricing)?;
        validate_email(&self.email)?;
        validate_files(&self.files)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parsed<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    let Some(value) = read_env(key) else {
        return Ok(None);
    };
    value.trim().parse::<T>().map(Some).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value,
    })
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("cotizador.toml"), PathBuf::from("config/cotizador.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::FileRead { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::FileParse { path: path.to_path_buf(), source })
}

/// Replaces every `${VAR}` in the raw file with the named environment
/// variable. A referenced variable that is unset is an error, not an empty
/// string.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let end = tail.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &tail[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &tail[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    let base = server.quote_base_url.trim();
    if !base.starts_with("http://") && !base.starts_with("https://") {
        return Err(ConfigError::Validation(
            "server.quote_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.iva_rate < Decimal::ZERO || pricing.iva_rate > Decimal::ONE {
        return Err(ConfigError::Validation(
            "pricing.iva_rate must be a fraction between 0 and 1".to_string(),
        ));
    }
    if pricing.default_deposit_rate < Decimal::ZERO || pricing.default_deposit_rate > Decimal::ONE {
        return Err(ConfigError::Validation(
            "pricing.default_deposit_rate must be a fraction between 0 and 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &EmailConfig) -> Result<(), ConfigError> {
    if email.enabled {
        let missing = email
            .sendgrid_api_key
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "email.sendgrid_api_key is required when email.enabled is true".to_string(),
            ));
        }
        if email.from.trim().is_empty() {
            return Err(ConfigError::Validation(
                "email.from is required when email.enabled is true".to_string(),
            ));
        }
    }

    if let Some(calendly_url) = &email.calendly_url {
        if !calendly_url.starts_with("http://") && !calendly_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "email.calendly_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_files(files: &FilesConfig) -> Result<(), ConfigError> {
    if files.signing_secret.expose_secret().len() < 32 {
        return Err(ConfigError::Validation(
            "files.signing_secret must be at least 32 characters".to_string(),
        ));
    }
    if files.url_ttl_minutes == 0 {
        return Err(ConfigError::Validation(
            "files.url_ttl_minutes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    pricing: Option<PricingPatch>,
    company: Option<CompanyPatch>,
    email: Option<EmailPatch>,
    files: Option<FilesPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
    quote_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    iva_rate: Option<Decimal>,
    default_deposit_rate: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct CompanyPatch {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    website: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EmailPatch {
    enabled: Option<bool>,
    sendgrid_api_key: Option<String>,
    from: Option<String>,
    bcc: Option<String>,
    calendly_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FilesPatch {
    data_dir: Option<String>,
    signing_secret: Option<String>,
    url_ttl_minutes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn with_vars(vars: &[(&str, &str)], body: impl FnOnce()) {
        let _guard = env_lock().lock().expect("env lock");
        for (key, value) in vars {
            env::set_var(key, value);
        }
        body();
        for (key, _) in vars {
            env::remove_var(key);
        }
    }

    #[test]
    fn defaults_pass_validation() {
        with_vars(&[], || {
            let config = AppConfig::load(LoadOptions::default()).expect("defaults should load");
            assert_eq!(config.pricing.iva_rate, Decimal::new(16, 2));
            assert_eq!(config.server.port, 4000);
            assert!(!config.email.enabled);
        });
    }

    #[test]
    fn file_load_supports_env_interpolation() {
        with_vars(&[("TEST_SENDGRID_KEY", "SG.from-env")], || {
            let dir = TempDir::new().expect("temp dir");
            let path = dir.path().join("cotizador.toml");
            fs::write(
                &path,
                r#"
[email]
enabled = true
sendgrid_api_key = "${TEST_SENDGRID_KEY}"
"#,
            )
            .expect("write config");

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .expect("config should load");

            let key = config.email.sendgrid_api_key.as_ref().expect("key present");
            assert_eq!(key.expose_secret(), "SG.from-env");
        });
    }

    #[test]
    fn precedence_defaults_file_env_overrides() {
        let vars = [
            ("COTIZADOR_DATABASE_URL", "sqlite://from-env.db"),
            ("COTIZADOR_IVA_RATE", "0.08"),
        ];
        with_vars(&vars, || {
            let dir = TempDir::new().expect("temp dir");
            let path = dir.path().join("cotizador.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[pricing]
iva_rate = 0.10

[logging]
level = "warn"
"#,
            )
            .expect("write config");

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .expect("config should load");

            // overrides > env > file > defaults
            assert_eq!(config.database.url, "sqlite://from-override.db");
            assert_eq!(config.pricing.iva_rate, Decimal::new(8, 2));
            assert_eq!(config.logging.level, "debug");
        });
    }

    #[test]
    fn enabled_email_without_api_key_fails_validation() {
        with_vars(&[("COTIZADOR_SEND_EMAILS", "true")], || {
            let error = AppConfig::load(LoadOptions::default())
                .expect_err("enabled email without a key must not validate");
            assert!(matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("sendgrid_api_key")
            ));
        });
    }

    #[test]
    fn short_signing_secret_is_rejected() {
        with_vars(&[("COTIZADOR_FILE_SIGNING_SECRET", "short")], || {
            let error = AppConfig::load(LoadOptions::default())
                .expect_err("short signing secret must not validate");
            assert!(matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("signing_secret")
            ));
        });
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() {
        with_vars(&[("COTIZADOR_SENDGRID_API_KEY", "SG.secret-value")], || {
            let config = AppConfig::load(LoadOptions::default()).expect("config should load");
            let debug = format!("{config:?}");

            assert!(!debug.contains("SG.secret-value"));
            assert_eq!(config.logging.format, LogFormat::Compact);
        });
    }

    #[test]
    fn logging_env_aliases_are_supported() {
        let vars = [("COTIZADOR_LOG_LEVEL", "warn"), ("COTIZADOR_LOG_FORMAT", "pretty")];
        with_vars(&vars, || {
            let config = AppConfig::load(LoadOptions::default()).expect("config should load");
            assert_eq!(config.logging.level, "warn");
            assert_eq!(config.logging.format, LogFormat::Pretty);
        });
    }

    #[test]
    fn invalid_numeric_env_override_is_reported_with_its_key() {
        with_vars(&[("COTIZADOR_SERVER_PORT", "not-a-port")], || {
            let error = AppConfig::load(LoadOptions::default())
                .expect_err("bad port must not validate");
            assert!(matches!(
                error,
                ConfigError::InvalidEnvOverride { ref key, .. } if key == "COTIZADOR_SERVER_PORT"
            ));
        });
    }
}
