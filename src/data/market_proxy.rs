use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::MarketDataConfig;
use crate::data::cache::ResponseCache;
use crate::data::coingecko::CoinGeckoClient;

const MARKETS_KEY: &str = "markets";

/// Upstream market data with caching and a local fallback listing.
pub struct MarketProxy {
    client: CoinGeckoClient,
    cache: ResponseCache,
    fallback_path: PathBuf,
    markets_ttl: Duration,
    coin_ttl: Duration,
}

impl MarketProxy {
    pub fn new(client: CoinGeckoClient, config: &MarketDataConfig, fallback_path: PathBuf) -> Self {
        Self {
            client,
            cache: ResponseCache::new(),
            fallback_path,
            markets_ttl: Duration::from_secs(config.markets_ttl_secs),
            coin_ttl: Duration::from_secs(config.coin_ttl_secs),
        }
    }

    /// Market listing. Always an array: upstream, then the fallback file,
    /// then empty.
    pub async fn markets(&self) -> Value {
        if let Some(cached) = self.cache.get(MARKETS_KEY) {
            return cached;
        }

        match self.client.fetch_markets().await {
            Ok(data) => {
                let count = data.as_array().map(Vec::len).unwrap_or(0);
                info!("✅ Loaded {} coins from CoinGecko", count);
                self.cache.insert(MARKETS_KEY.to_string(), data.clone(), self.markets_ttl);
                data
            }
            Err(e) => {
                warn!("CoinGecko failed, loading local fallback: {:#}", e);
                match self.load_fallback().await {
                    Ok(data) => data,
                    Err(fallback_err) => {
                        error!("Fallback load failed: {:#}", fallback_err);
                        Value::Array(Vec::new())
                    }
                }
            }
        }
    }

    pub async fn coin(&self, coin: &str) -> Result<Value> {
        let key = format!("coin:{}", coin);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let data = self.client.fetch_coin(coin).await?;
        self.cache.insert(key, data.clone(), self.coin_ttl);
        Ok(data)
    }

    async fn load_fallback(&self) -> Result<Value> {
        let contents = tokio::fs::read_to_string(&self.fallback_path)
            .await
            .with_context(|| format!("Failed to read {}", self.fallback_path.display()))?;
        let data: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.fallback_path.display()))?;
        if !data.is_array() {
            anyhow::bail!("Fallback {} is not a JSON array", self.fallback_path.display());
        }
        Ok(data)
    }
}
