pub mod cache;
pub mod coingecko;
pub mod market_proxy;
pub mod price_store;
pub mod types;
