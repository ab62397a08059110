mod api;
mod config;
mod data;
mod error;
mod inference;
mod model;
mod monitoring;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api::AppState;
use config::{Config, EnvConfig};
use data::coingecko::CoinGeckoClient;
use data::market_proxy::MarketProxy;
use data::price_store::{JsonPriceStore, PriceStore};
use inference::pipeline::InferencePipeline;
use model::registry::FileModelRegistry;
use monitoring::logger::CsvLogger;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coin_oracle=info,tower_http=info".into()),
        )
        .init();

    tracing::info!("🚀 Coin oracle v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let env_config = EnvConfig::load()?;
    tracing::info!("Loading configuration from {}", env_config.config_path);
    let config = Config::load(&env_config.config_path)?;

    tracing::info!("Price data: {}", config.storage.data_dir.display());
    tracing::info!("Models: {}", config.storage.model_dir.display());
    tracing::info!("Window: {} prices", config.inference.window);
    tracing::info!("Model cache: {}", config.inference.cache_models);

    let prices: Arc<dyn PriceStore> = Arc::new(
        JsonPriceStore::new(&config.storage.data_dir)
            .with_reserved_file(&config.storage.markets_fallback),
    );

    let mut registry = FileModelRegistry::new(&config.storage.model_dir, config.inference.window);
    if config.inference.cache_models {
        registry = registry.with_cache();
    }

    let pipeline = Arc::new(InferencePipeline::new(
        Arc::clone(&prices),
        Arc::new(registry),
        config.inference.window,
    ));

    let client = CoinGeckoClient::new(&config.market_data, env_config.coingecko_api_key.clone())?;
    let markets = Arc::new(MarketProxy::new(
        client,
        &config.market_data,
        config.storage.markets_fallback.clone(),
    ));

    let prediction_log = if config.monitoring.csv_logging {
        tracing::info!("Prediction log: {}", config.monitoring.csv_log_path.display());
        Some(Arc::new(CsvLogger::new(&config.monitoring.csv_log_path)?))
    } else {
        None
    };

    let state = Arc::new(AppState {
        pipeline,
        prices,
        markets,
        prediction_log,
    });
    let app = api::create_router(state);

    let addr = config.listen_addr(&env_config)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("✅ Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down...");
        })
        .await
        .context("Server error")?;

    Ok(())
}
