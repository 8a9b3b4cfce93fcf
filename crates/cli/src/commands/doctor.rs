use cotizador_core::catalog::loader::{self, CANDIDATE_FILES};
use cotizador_core::config::{AppConfig, LoadOptions};
use cotizador_db::connect_with_settings;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skip(name: &'static str) -> Self {
        Self {
            name,
            status: CheckStatus::Skipped,
            details: "skipped because configuration did not load".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

impl DoctorReport {
    fn render_text(&self) -> String {
        let mut lines: Vec<String> = self
            .checks
            .iter()
            .map(|check| {
                let marker = match check.status {
                    CheckStatus::Pass => "ok",
                    CheckStatus::Fail => "FAIL",
                    CheckStatus::Skipped => "skip",
                };
                format!("[{marker}] {}: {}", check.name, check.details)
            })
            .collect();
        lines.push(self.summary.clone());
        lines.join("\n")
    }
}

pub fn run(json_output: bool) -> String {
    let report = diagnose();

    if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            serde_json::json!({
                "overall_status": "fail",
                "summary": "doctor serialization failed",
                "error": error.to_string(),
            })
            .to_string()
        })
    } else {
        report.render_text()
    }
}

fn diagnose() -> DoctorReport {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => vec![
            DoctorCheck::pass("config_validation", "configuration loaded and validated"),
            database_check(&config),
            catalog_check(&config),
            renderer_check(),
        ],
        Err(error) => {
            let mut checks = vec![DoctorCheck::fail("config_validation", error.to_string())];
            checks.extend(
                ["database_connectivity", "catalog_presence", "pdf_renderer"]
                    .map(DoctorCheck::skip),
            );
            checks
        }
    };

    let healthy = checks.iter().all(|check| check.status != CheckStatus::Fail);
    DoctorReport {
        overall_status: if healthy { CheckStatus::Pass } else { CheckStatus::Fail },
        summary: if healthy {
            "doctor: all readiness checks passed".to_string()
        } else {
            "doctor: one or more readiness checks failed".to_string()
        },
        checks,
    }
}

fn database_check(config: &AppConfig) -> DoctorCheck {
    let probe = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| format!("failed to initialize async runtime: {error}"))
        .and_then(|runtime| {
            runtime.block_on(async {
                let pool = connect_with_settings(
                    &config.database.url,
                    config.database.max_connections,
                    config.database.timeout_secs,
                )
                .await
                .map_err(|error| format!("failed to connect to database: {error}"))?;
                pool.close().await;
                Ok(())
            })
        });

    match probe {
        Ok(()) => DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        ),
        Err(details) => DoctorCheck::fail("database_connectivity", details),
    }
}

fn catalog_check(config: &AppConfig) -> DoctorCheck {
    let found = CANDIDATE_FILES
        .iter()
        .map(|candidate| config.files.data_dir.join(candidate))
        .find(|path| path.exists());

    let Some(path) = found else {
        return DoctorCheck::fail(
            "catalog_presence",
            format!(
                "no catalog file under `{}` (run `cotizador seed`)",
                config.files.data_dir.display()
            ),
        );
    };

    match loader::load_file(&path, config.pricing.default_deposit_rate) {
        Ok(catalog) => DoctorCheck::pass(
            "catalog_presence",
            format!("{} products loaded from {}", catalog.len(), path.display()),
        ),
        Err(error) => {
            DoctorCheck::fail("catalog_presence", format!("catalog file is unreadable: {error}"))
        }
    }
}

fn renderer_check() -> DoctorCheck {
    match which::which("wkhtmltopdf") {
        Ok(path) => {
            DoctorCheck::pass("pdf_renderer", format!("wkhtmltopdf found at {}", path.display()))
        }
        // not fatal: quotes fall back to html
        Err(_) => DoctorCheck {
            name: "pdf_renderer",
            status: CheckStatus::Skipped,
            details: "wkhtmltopdf not on PATH; quotes will be stored as html".to_string(),
        },
    }
}
