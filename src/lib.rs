pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod uploads;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::db::SqliteRecordStore;
use crate::pipeline::diagnosis::DiagnosisService;
use crate::pipeline::evidence::{EvidenceAggregator, EvidenceEndpoints};
use crate::pipeline::narrative::{LlmEndpoints, NarrativeGenerator};
use crate::pipeline::prediction::training::{self, ForestParams, TrainingError, TrainingReport};
use crate::pipeline::prediction::ArtifactClassifier;

/// Connect timeout for the shared outbound HTTP client.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),

    #[error("Account bootstrap failed: {0}")]
    Auth(#[from] auth::AuthError),

    #[error("Model training failed: {0}")]
    Training(#[from] TrainingError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Train and save a model from the bundled sample data unless an artifact
/// is already present. Returns whether one was trained.
pub fn ensure_default_model(path: &Path) -> Result<bool, TrainingError> {
    if path.exists() {
        return Ok(false);
    }
    tracing::warn!(
        model = %path.display(),
        "No classifier artifact; training one from the bundled sample data"
    );
    let report = training::train_default_model(path)?;
    log_training_report(path, &report);
    Ok(true)
}

fn log_training_report(path: &Path, report: &TrainingReport) {
    tracing::info!(
        model = %path.display(),
        train_samples = report.train_samples,
        test_samples = report.test_samples,
        accuracy = ?report.accuracy,
        classes = ?report.classes,
        "Classifier trained"
    );
}

/// Options for the `train` command.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Patient CSV; the bundled sample data when absent.
    pub data: Option<PathBuf>,
    pub out: PathBuf,
    pub params: ForestParams,
    pub test_fraction: f64,
}

/// Train a forest from a patient CSV and write the artifact.
pub fn train_model(options: &TrainOptions) -> Result<TrainingReport, StartupError> {
    let samples = match &options.data {
        Some(path) => training::load_samples(path)?,
        None => training::read_samples(training::DEFAULT_TRAINING_DATA.as_bytes())?,
    };
    tracing::info!(samples = samples.len(), "Training data loaded");

    let (forest, report) =
        training::train_with_holdout(samples, &options.params, options.test_fraction)?;
    forest.save(&options.out)?;
    log_training_report(&options.out, &report);
    Ok(report)
}

/// Wire the services from `config` into an API context.
pub fn build_context(config: &config::AppConfig) -> Result<ApiContext, StartupError> {
    let conn = db::open_database(&config.database_path)?;
    let store = Arc::new(SqliteRecordStore::new(conn));
    tracing::info!(path = %config.database_path.display(), "Record store ready");

    auth::bootstrap_admin(
        store.as_ref(),
        config.bootstrap_admin_password.as_deref(),
        config.password_iterations,
    )?;

    std::fs::create_dir_all(&config.upload_dir)?;

    if config.train_default_model {
        ensure_default_model(&config.model_path)?;
    }
    let classifier = Arc::new(ArtifactClassifier::new(config.model_path.clone()));
    classifier.probe();

    let client = reqwest::Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .user_agent(concat!("diagnostic-system/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let evidence = Arc::new(EvidenceAggregator::from_config(
        client.clone(),
        config,
        &EvidenceEndpoints::default(),
    ));
    let narrative = Arc::new(NarrativeGenerator::new(
        client,
        config.llm.clone(),
        LlmEndpoints::default(),
        config.narrative_timeout,
    ));
    let diagnosis = Arc::new(DiagnosisService::new(
        store.clone(),
        classifier,
        evidence,
        narrative,
    ));

    Ok(ApiContext::new(config, store, diagnosis))
}

/// Load configuration, start the API server and run until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = config::AppConfig::from_env()?;
    let ctx = build_context(&config)?;

    let mut server = api::start_api_server(ctx, config.bind_addr).await?;
    tracing::info!(addr = %server.addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.wait().await;
    Ok(())
}
