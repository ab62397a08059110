use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    #[serde(default = "default_markets_fallback")]
    pub markets_fallback: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_true")]
    pub cache_models: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
    #[serde(default = "default_order")]
    pub order: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_markets_ttl")]
    pub markets_ttl_secs: u64,
    #[serde(default = "default_coin_ttl")]
    pub coin_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub csv_logging: bool,
    #[serde(default = "default_csv_log_path")]
    pub csv_log_path: PathBuf,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8000 }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_model_dir() -> PathBuf { PathBuf::from("models") }
fn default_markets_fallback() -> PathBuf { PathBuf::from("data/markets.json") }
fn default_window() -> usize { 60 }
fn default_true() -> bool { true }
fn default_base_url() -> String { "https://api.coingecko.com/api/v3".to_string() }
fn default_timeout() -> u64 { 5 }
fn default_vs_currency() -> String { "usd".to_string() }
fn default_order() -> String { "market_cap_desc".to_string() }
fn default_per_page() -> u32 { 100 }
fn default_page() -> u32 { 1 }
fn default_markets_ttl() -> u64 { 60 }
fn default_coin_ttl() -> u64 { 300 }
fn default_csv_log_path() -> PathBuf { PathBuf::from("predictions.csv") }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            model_dir: default_model_dir(),
            markets_fallback: default_markets_fallback(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self { window: default_window(), cache_models: default_true() }
    }
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            vs_currency: default_vs_currency(),
            order: default_order(),
            per_page: default_per_page(),
            page: default_page(),
            markets_ttl_secs: default_markets_ttl(),
            coin_ttl_secs: default_coin_ttl(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self { csv_logging: false, csv_log_path: default_csv_log_path() }
    }
}

/// Values taken from the process environment (and `.env`, if present).
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub config_path: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub coingecko_api_key: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        if config.inference.window == 0 {
            anyhow::bail!("inference.window must be at least 1");
        }
        Ok(config)
    }

    /// Resolve the listen address, letting the environment override the file.
    pub fn listen_addr(&self, env: &EnvConfig) -> Result<SocketAddr> {
        let host = env.host.as_deref().unwrap_or(&self.server.host);
        let port = env.port.unwrap_or(self.server.port);
        format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", host, port))
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let port = match std::env::var("PORT") {
            Ok(raw) => Some(
                raw.parse::<u16>()
                    .with_context(|| format!("PORT must be a valid number, got '{}'", raw))?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            config_path: std::env::var("CONFIG_PATH")
                .unwrap_or_else(|_| "config.toml".to_string()),
            host: std::env::var("HOST").ok(),
            port,
            coingecko_api_key: std::env::var("COINGECKO_API_KEY").ok(),
        })
    }
}
