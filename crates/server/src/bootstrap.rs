use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use callcart_agent::AgentRuntime;
use callcart_core::config::{AppConfig, ConfigError, LoadOptions};
use callcart_db::{connect_with_settings, migrations, DbPool, Repositories};

use crate::state::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub repositories: Repositories,
    pub agent: Arc<AgentRuntime>,
}

impl Application {
    pub fn state(&self) -> AppState {
        AppState::new(&self.config, self.repositories.clone(), self.agent.clone())
    }
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
    Agent(#[source] anyhow::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        environment = config.server.environment.as_str(),
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

    let agent = AgentRuntime::from_config(&config.llm).map_err(BootstrapError::Agent)?;
    info!(
        event_name = "system.bootstrap.llm_ready",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        model = config.llm.model(),
        "llm client configured"
    );

    let repositories = Repositories::sql(db_pool.clone());
    Ok(Application { config, db_pool, repositories, agent: Arc::new(agent) })
}

#[cfg(test)]
mod tests {
    use callcart_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_against_memory_store() {
        let app = bootstrap(overrides("sqlite::memory:")).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('merchant', 'product', 'call_session', 'intent')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("catalog tables");
        assert_eq!(table_count, 4);

        let state = app.state();
        assert!(state.webhook.verifier.is_none());

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn unreachable_database_fails_fast() {
        let result = bootstrap(overrides("sqlite:///nonexistent-dir/for/callcart.db")).await;

        assert!(matches!(result, Err(BootstrapError::DatabaseConnect(_))));
    }
}
