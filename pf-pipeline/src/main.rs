//! pf-pipeline - Contact-Discovery Batch Pipeline service
//!
//! Resolves email/phone contact data for batches of people by walking an
//! ordered provider waterfall, one rate-limited job at a time, and reports
//! each batch's aggregate result exactly once.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pf_pipeline::pause::PauseRegistry;
use pf_pipeline::processor::BatchProcessor;
use pf_pipeline::providers::{
    DataLakeClient, DomainEmailClient, ProfileEmailClient, ProviderSet,
};
use pf_pipeline::{build_router, worker, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting pf-pipeline (contact discovery) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Configuration: env > TOML file > defaults
    let config = pf_common::config::load_config()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    let data_dir = pf_common::config::resolve_data_dir(&config);
    std::fs::create_dir_all(&data_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create data dir {}: {}", data_dir.display(), e))?;

    let db_path = pf_common::config::database_path(&data_dir);
    info!("Database: {}", db_path.display());

    let db_pool = pf_pipeline::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // Provider adapters from configuration
    let providers = ProviderSet {
        data_lake: Arc::new(DataLakeClient::new(
            config
                .providers
                .data_lake
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.datalake.example".to_string()),
            config.providers.data_lake.api_key.clone().unwrap_or_default(),
        )),
        domain_email: Arc::new(DomainEmailClient::new(
            config
                .providers
                .domain_email
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.domainmail.example".to_string()),
            config.providers.domain_email.api_key.clone().unwrap_or_default(),
        )),
        profile_email: Arc::new(ProfileEmailClient::new(
            config
                .providers
                .profile_email
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.profilemail.example".to_string()),
            config.providers.profile_email.api_key.clone().unwrap_or_default(),
        )),
    };

    let pause = PauseRegistry::new(db_pool.clone());
    let processor = Arc::new(BatchProcessor::new(
        db_pool.clone(),
        providers,
        pause,
        config.public_base_url.clone(),
        config.queue.max_attempts,
    ));

    let state = AppState::new(db_pool, processor);

    // Single queue worker, rate limited per rolling minute
    tokio::spawn(worker::run_worker(
        Arc::clone(&state.processor),
        config.queue.jobs_per_minute,
        Arc::clone(&state.last_error),
    ));

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
