use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use wspay_gateway::api::{self, AppState};
use wspay_gateway::commerce::{CommerceStore, MemoryStore};
use wspay_gateway::config::Config;
use wspay_gateway::payments::providers::WsPayProvider;
use wspay_gateway::views::Views;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();

    // Load configuration
    let config = Arc::new(Config::from_env()?);

    tracing::info!("Starting WSPay gateway");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!(
        "WSPay shop: {} (form: {})",
        config.wspay.shop_id,
        config.wspay.form_url
    );

    let store = connect_store(&config).await?;
    tracing::info!("Using {} store", store.backend());

    let provider = Arc::new(WsPayProvider::new(config.clone(), store.clone()));
    let views = Arc::new(Views::new().context("Failed to load page templates")?);

    let app = api::router(AppState {
        config: config.clone(),
        store,
        provider,
        views,
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

/// JSON logs in production, human-readable elsewhere; `RUST_LOG` wins.
fn init_tracing() {
    let production = std::env::var("ENVIRONMENT").is_ok_and(|env| env == "production");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if production {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(feature = "database")]
async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn CommerceStore>> {
    use wspay_gateway::database::{self, PgCommerceStore, PoolConfig};

    let Some(db) = &config.database else {
        tracing::warn!("DATABASE_URL not set, carts and orders are kept in memory");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let pool_config = PoolConfig::default().with_max_connections(db.max_connections);
    let pool = database::init_pool(&db.url, Some(pool_config))
        .await
        .context("Failed to connect to the database")?;
    database::run_migrations(&pool)
        .await
        .context("Failed to apply database migrations")?;

    Ok(Arc::new(PgCommerceStore::new(pool)))
}

#[cfg(not(feature = "database"))]
async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn CommerceStore>> {
    if config.database.is_some() {
        tracing::warn!("Built without the database feature, ignoring DATABASE_URL");
    }
    Ok(Arc::new(MemoryStore::new()))
}
