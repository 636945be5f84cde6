use std::env;

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Must be a production-grade RDBMS —
    /// finalization refuses to run against anything else.
    pub database_url: String,

    /// Default lens id, used only when neither `--lens` nor `LENS_ID` is
    /// set. Distinct from `LENS_ID` (env precedence tier) — this is the
    /// application-config tier, read from `DEFAULT_LENS_ID`.
    pub default_lens: Option<String>,

    /// Directory lenses are loaded from, one `<id>.yaml` per lens.
    pub lens_search_path: String,

    /// Daily spend ceiling in USD. `None` = unlimited.
    pub daily_budget_usd: Option<f64>,

    /// Root directory raw payloads are written under
    /// (`<data_root>/raw/<source>/<hash>.json`).
    pub data_root: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            default_lens: env::var("DEFAULT_LENS_ID").ok(),
            lens_search_path: env::var("LENS_SEARCH_PATH")
                .unwrap_or_else(|_| "./lenses".to_string()),
            daily_budget_usd: env::var("DAILY_BUDGET_USD")
                .ok()
                .and_then(|v| v.parse().ok()),
            data_root: env::var("DATA_ROOT").unwrap_or_else(|_| "./data".to_string()),
        }
    }

    /// Log which optional env vars are set, without leaking values.
    pub fn log_redacted(&self) {
        tracing::info!("DATABASE_URL = ({} chars)", self.database_url.len());
        match &self.default_lens {
            Some(id) => tracing::info!("LENS_ID = {id}"),
            None => tracing::info!("LENS_ID = (unset)"),
        }
        tracing::info!("LENS_SEARCH_PATH = {}", self.lens_search_path);
        match self.daily_budget_usd {
            Some(b) => tracing::info!("DAILY_BUDGET_USD = {b}"),
            None => tracing::info!("DAILY_BUDGET_USD = (unlimited)"),
        }
        tracing::info!("DATA_ROOT = {}", self.data_root);
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
