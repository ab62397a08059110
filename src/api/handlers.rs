use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::warn;

use crate::api::dto::*;
use crate::api::AppState;
use crate::data::types::CoinSummary;
use crate::error::PipelineError;
use crate::inference::pipeline::InferenceResult;
use crate::inference::signal::{latest_signal, SignalReport};

static COIN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").expect("valid coin id pattern"));

/// Only plain identifiers may address storage.
pub fn validate_coin(coin: &str) -> Result<&str, String> {
    if COIN_ID.is_match(coin) {
        Ok(coin)
    } else {
        Err(format!("Invalid coin identifier '{}'", coin))
    }
}

fn coin_param(query: Result<Query<CoinQuery>, QueryRejection>) -> Result<String, String> {
    let Query(query) = query.map_err(|e| e.body_text())?;
    validate_coin(&query.coin).map(str::to_string)
}

/// Run storage/model work off the async runtime.
async fn blocking<T, F>(coin: &str, work: F) -> Result<T, String>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!("{}: {}", coin, e);
            Err(e.to_string())
        }
        Err(e) => {
            warn!("{}: worker failed: {}", coin, e);
            Err(format!("Internal error: {}", e))
        }
    }
}

/// GET /
pub async fn home() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        message: "AI Prediction API Running",
    })
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "alive",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// GET /predict?coin=
pub async fn predict(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CoinQuery>, QueryRejection>,
) -> ApiResponse<InferenceResult> {
    let coin = match coin_param(query) {
        Ok(coin) => coin,
        Err(e) => return ApiResponse::error(e),
    };

    let pipeline = Arc::clone(&state.pipeline);
    let symbol = coin.clone();
    let result = blocking(&coin, move || pipeline.predict(&symbol)).await;

    if let (Ok(prediction), Some(log)) = (&result, &state.prediction_log) {
        if let Err(e) = log.log_prediction(&coin, prediction) {
            warn!("Failed to write prediction log {}: {:#}", log.path().display(), e);
        }
    }
    result.into()
}

/// GET /available-coins
pub async fn available_coins(State(state): State<Arc<AppState>>) -> ApiResponse<CoinsResponse> {
    let prices = Arc::clone(&state.prices);
    blocking("available-coins", move || prices.list_available())
        .await
        .map(|coins| CoinsResponse { coins })
        .into()
}

/// GET /debug-prices?coin=
pub async fn debug_prices(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CoinQuery>, QueryRejection>,
) -> ApiResponse<DebugPricesResponse> {
    let coin = match coin_param(query) {
        Ok(coin) => coin,
        Err(e) => return ApiResponse::error(e),
    };

    let prices = Arc::clone(&state.prices);
    let window = state.pipeline.window();
    let symbol = coin.clone();
    blocking(&coin, move || prices.load(&symbol))
        .await
        .map(|series| DebugPricesResponse {
            coin,
            last_60_prices: series.tail(window),
        })
        .into()
}

/// GET /signal?coin=
pub async fn signal(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CoinQuery>, QueryRejection>,
) -> ApiResponse<SignalReport> {
    let coin = match coin_param(query) {
        Ok(coin) => coin,
        Err(e) => return ApiResponse::error(e),
    };

    let prices = Arc::clone(&state.prices);
    let symbol = coin.clone();
    blocking(&coin, move || latest_signal(prices.as_ref(), &symbol))
        .await
        .into()
}

/// GET /local-coin-data?coin=
pub async fn local_coin_data(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CoinQuery>, QueryRejection>,
) -> ApiResponse<CoinSummary> {
    let coin = match coin_param(query) {
        Ok(coin) => coin,
        Err(e) => return ApiResponse::error(e),
    };

    let prices = Arc::clone(&state.prices);
    let symbol = coin.clone();
    let latest = blocking(&coin, move || {
        let series = prices.load(&symbol)?;
        if series.is_empty() {
            return Ok(None);
        }
        let last = series
            .tail_records(1)
            .map_err(|reason| PipelineError::malformed(&symbol, reason))?;
        Ok(last.first().copied())
    })
    .await;

    match latest {
        Ok(Some(price)) => ApiResponse::Ok(CoinSummary::from_local(&coin, price)),
        Ok(None) => ApiResponse::error("No price data"),
        Err(e) => ApiResponse::error(e),
    }
}

/// GET /proxy/coin/{coin}
pub async fn proxy_coin(
    State(state): State<Arc<AppState>>,
    Path(coin): Path<String>,
) -> ApiResponse<Value> {
    if let Err(e) = validate_coin(&coin) {
        return ApiResponse::error(e);
    }
    match state.markets.coin(&coin).await {
        Ok(body) => ApiResponse::Ok(body),
        Err(e) => {
            warn!("Coin proxy failed for {}: {:#}", coin, e);
            ApiResponse::error(e)
        }
    }
}

/// GET /proxy/markets
pub async fn proxy_markets(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.markets.markets().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coin() {
        assert!(validate_coin("bitcoin").is_ok());
        assert!(validate_coin("usd-coin").is_ok());
        assert!(validate_coin("wrapped_btc2").is_ok());
        assert!(validate_coin("").is_err());
        assert!(validate_coin("../secrets").is_err());
        assert!(validate_coin("a/b").is_err());
        assert!(validate_coin("-leading").is_err());
        assert!(validate_coin(&"x".repeat(65)).is_err());
    }
}
