use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Diagnostic System";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address (all interfaces, port 5000).
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

/// Default PBKDF2 iteration count for stored password hashes.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 600_000;

/// Session tokens expire after 12 hours.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 12 * 60 * 60;

/// Per-source timeout for evidence lookups.
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 15;

/// Upper bound on a single LLM narrative call.
pub const DEFAULT_NARRATIVE_TIMEOUT_SECS: u64 = 90;

/// Maximum accepted upload body (16 MiB).
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Default `tracing` filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "diagnostic_lib=info,diagnostic_system=info,tower_http=warn"
}

/// Get the application data directory
/// ~/DiagnosticSystem/ on all platforms
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("DiagnosticSystem")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// API credentials for the narrative backends. Absent keys select the fallback.
#[derive(Debug, Clone, Default)]
pub struct LlmCredentials {
    pub groq: Option<String>,
    pub google: Option<String>,
    pub openai: Option<String>,
}

impl LlmCredentials {
    pub fn from_env() -> Self {
        Self {
            groq: non_empty_env("GROQ_API_KEY"),
            google: non_empty_env("GOOGLE_API_KEY"),
            openai: non_empty_env("OPENAI_API_KEY"),
        }
    }
}

/// Runtime configuration, read once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub model_path: PathBuf,
    pub upload_dir: PathBuf,
    pub password_iterations: u32,
    pub session_ttl: Duration,
    pub lookup_timeout: Duration,
    pub narrative_timeout: Duration,
    pub literature_max_results: usize,
    pub bootstrap_admin_password: Option<String>,
    /// Train a model from the bundled sample data when no artifact exists.
    pub train_default_model: bool,
    pub llm: LlmCredentials,
}

impl AppConfig {
    /// Defaults rooted at `data_dir`, no credentials.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 5000))),
            database_path: data_dir.join("records.db"),
            model_path: data_dir.join("model").join("diagnostic_model.json"),
            upload_dir: data_dir.join("uploads"),
            data_dir,
            password_iterations: DEFAULT_PASSWORD_ITERATIONS,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            lookup_timeout: Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS),
            narrative_timeout: Duration::from_secs(DEFAULT_NARRATIVE_TIMEOUT_SECS),
            literature_max_results: 3,
            bootstrap_admin_password: None,
            train_default_model: true,
            llm: LlmCredentials::default(),
        }
    }

    /// Build configuration from `DIAGNOSTIC_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = non_empty_env("DIAGNOSTIC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);
        let mut config = Self::with_data_dir(data_dir);

        if let Some(addr) = non_empty_env("DIAGNOSTIC_BIND") {
            config.bind_addr = addr.parse().map_err(|_| ConfigError::InvalidValue {
                var: "DIAGNOSTIC_BIND",
                value: addr.clone(),
            })?;
        }
        if let Some(path) = non_empty_env("DIAGNOSTIC_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty_env("DIAGNOSTIC_MODEL_PATH") {
            config.model_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty_env("DIAGNOSTIC_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(path);
        }
        if let Some(raw) = non_empty_env("DIAGNOSTIC_PASSWORD_ITERATIONS") {
            config.password_iterations = parse_iterations(&raw)?;
        }
        if let Some(secs) = parse_env::<u64>("DIAGNOSTIC_SESSION_TTL_SECS")? {
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("DIAGNOSTIC_LOOKUP_TIMEOUT_SECS")? {
            config.lookup_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("DIAGNOSTIC_NARRATIVE_TIMEOUT_SECS")? {
            config.narrative_timeout = Duration::from_secs(secs);
        }
        if let Some(train) = parse_env::<bool>("DIAGNOSTIC_TRAIN_DEFAULT_MODEL")? {
            config.train_default_model = train;
        }
        config.bootstrap_admin_password = non_empty_env("DIAGNOSTIC_ADMIN_PASSWORD");
        config.llm = LlmCredentials::from_env();

        Ok(config)
    }
}

/// PBKDF2 needs at least one iteration; a zero count produces hashes that
/// can never be verified.
fn parse_iterations(raw: &str) -> Result<u32, ConfigError> {
    raw.parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            var: "DIAGNOSTIC_PASSWORD_ITERATIONS",
            value: raw.to_string(),
        })
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match non_empty_env(var) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
    }
}
