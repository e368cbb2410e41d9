//! Storefront - REST backend for a small online shop

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::api::{self, AppState, JwtKeys};
use storefront::publisher::{EventPublisher, NatsPublisher, NoopPublisher};
use storefront::service::Services;
use storefront::store::PgStore;
use storefront::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let publisher: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsPublisher::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will not be published");
                Arc::new(NoopPublisher)
            }
        },
        None => Arc::new(NoopPublisher),
    };

    let services = Services::new(
        Arc::new(PgStore::new(db)),
        publisher,
        config.promo_formula,
        config.bcrypt_cost,
    );
    let state = AppState {
        services,
        jwt: JwtKeys::new(&config.jwt_secret, config.jwt_ttl_hours),
    };
    let app = api::router(state);

    tracing::info!(
        port = config.port,
        promo_formula = ?config.promo_formula,
        "Storefront listening on 0.0.0.0:{}",
        config.port
    );
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
