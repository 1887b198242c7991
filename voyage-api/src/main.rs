use anyhow::Context;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voyage_api::app;
use voyage_api::state::{AppState, AuthConfig, RateLimit};
use voyage_store::app_config::Config;
use voyage_store::{DbClient, RedisClient, Repositories};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voyage_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Voyage API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    // Redis is optional; without it requests are not rate limited
    let redis = match &config.redis {
        Some(redis) => Some(
            RedisClient::new(&redis.url)
                .await
                .context("Failed to create Redis client")?,
        ),
        None => {
            tracing::warn!("No Redis configured, rate limiting disabled");
            None
        }
    };

    let app_state = AppState::new(
        Repositories::postgres(db.pool.clone()),
        redis,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        RateLimit {
            requests_per_window: config.rate_limit.requests_per_window,
            window_seconds: config.rate_limit.window_seconds,
        },
        config.auth.bcrypt_cost,
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
