use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use taskmint_agent::{build_llm_client, TaskExtractor};
use taskmint_core::config::{AppConfig, ConfigError, LoadOptions};
use taskmint_core::password::PasswordHasher;
use taskmint_db::{
    connect_with_settings, migrations, DbPool, SqlTaskRepository, SqlUserRepository,
};

use crate::auth::TokenIssuer;
use crate::rate_limit::RateLimiter;
use crate::state::ApiState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    Llm(#[source] anyhow::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let llm = build_llm_client(&config.llm).map_err(BootstrapError::Llm)?;

    let state = ApiState {
        users: Arc::new(SqlUserRepository::new(db_pool.clone())),
        tasks: Arc::new(SqlTaskRepository::new(db_pool.clone())),
        extractor: Arc::new(TaskExtractor::new(llm, &config.extraction)),
        tokens: Arc::new(TokenIssuer::new(&config.auth)),
        hasher: PasswordHasher::new(config.auth.password_iterations),
        limiter: Arc::new(RateLimiter::new()),
    };

    Ok(Application { config, db_pool, state })
}
