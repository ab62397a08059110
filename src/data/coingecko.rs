use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::config::MarketDataConfig;

/// Thin client for the CoinGecko public API. Responses are passed through
/// as raw JSON.
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    vs_currency: String,
    order: String,
    per_page: u32,
    page: u32,
}

impl CoinGeckoClient {
    pub fn new(config: &MarketDataConfig, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            vs_currency: config.vs_currency.clone(),
            order: config.order.clone(),
            per_page: config.per_page,
            page: config.page,
        })
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.api_key {
            Some(key) => request.header("x-cg-demo-api-key", key),
            None => request,
        }
    }

    /// Fetch one page of the market listing.
    pub async fn fetch_markets(&self) -> Result<Value> {
        let url = format!("{}/coins/markets", self.base_url);
        let per_page = self.per_page.to_string();
        let page = self.page.to_string();

        let data: Value = self
            .get(&url)
            .query(&[
                ("vs_currency", self.vs_currency.as_str()),
                ("order", self.order.as_str()),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
            ])
            .send()
            .await
            .context("Failed to fetch markets")?
            .json()
            .await
            .context("Failed to parse markets response")?;

        if !data.is_array() {
            anyhow::bail!("Invalid response format from CoinGecko");
        }

        Ok(data)
    }

    /// Fetch the detail record of one coin.
    pub async fn fetch_coin(&self, coin: &str) -> Result<Value> {
        let url = format!("{}/coins/{}", self.base_url, coin);

        let response = self
            .get(&url)
            .query(&[
                ("localization", "false"),
                ("tickers", "false"),
                ("market_data", "true"),
            ])
            .send()
            .await
            .context("Failed to fetch coin data")?;

        if response.status() != StatusCode::OK {
            anyhow::bail!("Failed to fetch coin data from CoinGecko for '{}'", coin);
        }

        response
            .json()
            .await
            .context("Failed to parse coin response")
    }
}
