use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use taskmint_core::config::LlmConfig;
use taskmint_db::DbPool;
use tracing::{error, info};

/// Tables the baseline migration owns; the database check degrades when any
/// are missing so a half-provisioned instance reports unhealthy instead of
/// failing on the first API request.
const REQUIRED_TABLES: [&str; 2] = ["users", "tasks"];

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    extraction_summary: String,
}

impl HealthState {
    pub fn new(db_pool: DbPool, llm: &LlmConfig) -> Self {
        let provider = format!("{:?}", llm.provider).to_lowercase();
        Self {
            db_pool,
            extraction_summary: format!("{provider} provider with model `{}`", llm.model),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub name: &'static str,
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub checks: Vec<HealthCheck>,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let checks = vec![
        HealthCheck {
            name: "api",
            status: "ready",
            detail: "request pipeline initialized".to_string(),
        },
        database_check(&state.db_pool).await,
        HealthCheck { name: "extraction", status: "ready", detail: state.extraction_summary },
    ];

    let ready = checks.iter().all(|check| check.status == "ready");
    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        checks,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    let placeholders = vec!["?"; REQUIRED_TABLES.len()].join(", ");
    let sql = format!(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ({placeholders})"
    );
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for table in REQUIRED_TABLES {
        query = query.bind(table);
    }

    match query.fetch_one(pool).await {
        Ok(count) if count as usize == REQUIRED_TABLES.len() => HealthCheck {
            name: "database",
            status: "ready",
            detail: "task store reachable and schema is current".to_string(),
        },
        Ok(count) => HealthCheck {
            name: "database",
            status: "degraded",
            detail: format!(
                "schema incomplete ({count} of {} managed tables); run `taskmint migrate`",
                REQUIRED_TABLES.len()
            ),
        },
        Err(error) => HealthCheck {
            name: "database",
            status: "degraded",
            detail: format!("database query failed: {error}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use taskmint_core::config::{LlmConfig, LlmProvider};
    use taskmint_db::{connect_with_settings, migrations, DbPool};

    use crate::health::{health, HealthCheck, HealthState};

    fn llm_config() -> LlmConfig {
        LlmConfig {
            provider: LlmProvider::Ollama,
            api_key: None,
            base_url: Some("http://localhost:11434".to_string()),
            model: "llama3.1".to_string(),
            timeout_secs: 30,
        }
    }

    fn named<'a>(checks: &'a [HealthCheck], name: &str) -> &'a HealthCheck {
        checks.iter().find(|check| check.name == name).expect("check present")
    }

    async fn migrated_pool() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations should apply");
        pool
    }

    #[tokio::test]
    async fn health_returns_ready_with_a_migrated_database() {
        let pool = migrated_pool().await;

        let (status, Json(payload)) =
            health(State(HealthState::new(pool.clone(), &llm_config()))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(named(&payload.checks, "database").status, "ready");
        assert!(named(&payload.checks, "extraction").detail.contains("llama3.1"));

        pool.close().await;
    }

    #[tokio::test]
    async fn health_degrades_when_the_schema_is_missing() {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(payload)) =
            health(State(HealthState::new(pool.clone(), &llm_config()))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        let database = named(&payload.checks, "database");
        assert_eq!(database.status, "degraded");
        assert!(database.detail.contains("taskmint migrate"));

        pool.close().await;
    }

    #[tokio::test]
    async fn health_degrades_when_the_database_is_unreachable() {
        let pool = migrated_pool().await;
        pool.close().await;

        let (status, Json(payload)) =
            health(State(HealthState::new(pool, &llm_config()))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(named(&payload.checks, "database").status, "degraded");
        assert_eq!(named(&payload.checks, "api").status, "ready");
    }
}
