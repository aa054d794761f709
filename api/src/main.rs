use std::sync::Arc;

use anyhow::{Context, Result};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;

use api::config::{AppConfig, StorageBackend};
use api::observability::Observability;
use api::rate_limit::RateLimitState;
use api::risk::{RecaptchaOracle, RiskScoreGate};
use api::routes;
use api::state::AppState;
use api::store::{InMemoryRegistrationStore, PgRegistrationStore, RegistrationStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv().ok();

    let obs = Observability::init()?;
    let config = AppConfig::from_env()?;

    let store: Arc<dyn RegistrationStore> = match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;

            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await?;

            sqlx::migrate!("../migrations").run(&pool).await?;
            tracing::info!("Database connected and migrations applied");

            Arc::new(PgRegistrationStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, registrations will not survive a restart");
            Arc::new(InMemoryRegistrationStore::new())
        }
    };

    let risk_gate = match &config.recaptcha_secret_key {
        Some(secret) => RiskScoreGate::new(
            Arc::new(
                RecaptchaOracle::new(
                    secret.clone(),
                    config.recaptcha_verify_url.clone(),
                    config.recaptcha_timeout,
                )
                .context("failed to build reCAPTCHA HTTP client")?,
            ),
            config.recaptcha_threshold,
            config.recaptcha_timeout,
        ),
        None => {
            tracing::warn!("RECAPTCHA_SECRET_KEY not set, risk gate running in bypass mode");
            RiskScoreGate::unconfigured()
        }
    };

    let state = AppState::new(store, risk_gate, obs.registry);
    let rate_limit = config
        .rate_limit_enabled
        .then(|| RateLimitState::from_config(&config));

    let app = routes::app(state, rate_limit, &config.cors_origins);

    tracing::info!("API server listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
