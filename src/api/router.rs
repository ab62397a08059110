use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{handlers, AppState};

/// Create the REST API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        // Inference and local data
        .route("/predict", get(handlers::predict))
        .route("/available-coins", get(handlers::available_coins))
        .route("/debug-prices", get(handlers::debug_prices))
        .route("/signal", get(handlers::signal))
        .route("/local-coin-data", get(handlers::local_coin_data))
        // Market-data proxy
        .route("/proxy/coin/{coin}", get(handlers::proxy_coin))
        .route("/proxy/markets", get(handlers::proxy_markets))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketDataConfig;
    use crate::data::coingecko::CoinGeckoClient;
    use crate::data::market_proxy::MarketProxy;
    use crate::data::price_store::{JsonPriceStore, PriceStore};
    use crate::inference::pipeline::InferencePipeline;
    use crate::model::registry::tests::{constant_model_json, scaler_json};
    use crate::model::registry::FileModelRegistry;
    use crate::monitoring::logger::CsvLogger;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn records(prices: &[f64]) -> String {
        let entries: Vec<Value> = prices.iter().map(|p| json!({ "price": p })).collect();
        Value::Array(entries).to_string()
    }

    /// data/ and models/ under one temp dir:
    /// - bitcoin: 59 x 90.0 then 100.0, model predicting 105.0
    /// - short: 10 points, model present
    /// - nomodel: 60 points, no artifacts
    /// - mixed: bare numbers and records, newest entry bare
    /// - legacy: 40 bare numbers, then the bitcoin records, model present
    /// - tiny: 10 bare numbers
    /// - empty: no points
    fn fixture(root: &Path) {
        let data = root.join("data");
        let models = root.join("models");
        fs::create_dir_all(&data).unwrap();
        fs::create_dir_all(&models).unwrap();

        let mut bitcoin = vec![90.0; 59];
        bitcoin.push(100.0);
        fs::write(data.join("bitcoin.json"), records(&bitcoin)).unwrap();
        fs::write(data.join("short.json"), records(&[1.0; 10])).unwrap();
        fs::write(data.join("nomodel.json"), records(&[1.0; 60])).unwrap();
        fs::write(data.join("mixed.json"), r#"[1.0, {"price": 2.0}, 3.5]"#).unwrap();
        fs::write(data.join("empty.json"), "[]").unwrap();
        let mut legacy: Vec<Value> = vec![json!(50.0); 40];
        legacy.extend(bitcoin.iter().map(|p| json!({ "price": p })));
        fs::write(data.join("legacy.json"), Value::Array(legacy).to_string()).unwrap();
        fs::write(data.join("tiny.json"), Value::Array(vec![json!(1.0); 10]).to_string()).unwrap();
        fs::write(data.join("markets.json"), r#"[{"id": "bitcoin", "current_price": 100.0}]"#).unwrap();

        for symbol in ["bitcoin", "short", "legacy", "tiny"] {
            fs::write(models.join(format!("{}.json", symbol)), constant_model_json(60, 0.525)).unwrap();
            fs::write(models.join(format!("{}_scaler.json", symbol)), scaler_json(0.0, 200.0)).unwrap();
        }
    }

    fn test_state(root: &Path, prediction_log: Option<Arc<CsvLogger>>) -> Arc<AppState> {
        let fallback = root.join("data").join("markets.json");
        let prices: Arc<dyn PriceStore> =
            Arc::new(JsonPriceStore::new(root.join("data")).with_reserved_file(&fallback));
        let registry = Arc::new(FileModelRegistry::new(root.join("models"), 60).with_cache());
        let pipeline = Arc::new(InferencePipeline::new(Arc::clone(&prices), registry, 60));

        let market_config = MarketDataConfig {
            base_url: "http://127.0.0.1:9/api/v3".to_string(),
            timeout_secs: 1,
            ..MarketDataConfig::default()
        };
        let client = CoinGeckoClient::new(&market_config, None).unwrap();
        let markets = Arc::new(MarketProxy::new(client, &market_config, fallback));

        Arc::new(AppState { pipeline, prices, markets, prediction_log })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        fixture(dir.path());
        let router = create_router(test_state(dir.path(), None));
        (dir, router)
    }

    fn error_of(json: &Value) -> &str {
        json["error"].as_str().unwrap_or_else(|| panic!("expected error payload, got {}", json))
    }

    #[tokio::test]
    async fn test_home() {
        let (_dir, app) = app();
        let (status, json) = get_json(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "status": "ok", "message": "AI Prediction API Running" }));
    }

    #[tokio::test]
    async fn test_predict_up() {
        let (_dir, app) = app();
        let (status, json) = get_json(app, "/predict?coin=bitcoin").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({
                "prediction": "up",
                "confidence": 0.05,
                "predicted_price": 105.0,
                "last_price": 100.0
            })
        );
    }

    #[tokio::test]
    async fn test_predict_accepts_symbol_alias() {
        let (_dir, app) = app();
        let (_, json) = get_json(app, "/predict?symbol=bitcoin").await;
        assert_eq!(json["prediction"], "up");
    }

    #[tokio::test]
    async fn test_predict_errors_are_200_with_error_field() {
        let (dir, _) = app();
        let cases = [
            ("/predict?coin=short", "Not enough data"),
            ("/predict?coin=nomodel", "No model found"),
            ("/predict?coin=ghost", "No price data found"),
            ("/predict?coin=..%2Fdata%2Fbitcoin", "Invalid coin identifier"),
            ("/predict", "coin"),
        ];
        for (uri, needle) in cases {
            let app = create_router(test_state(dir.path(), None));
            let (status, json) = get_json(app, uri).await;
            assert_eq!(status, StatusCode::OK, "{}", uri);
            assert!(error_of(&json).contains(needle), "{} -> {}", uri, json);
        }
    }

    #[tokio::test]
    async fn test_old_bare_entries_do_not_block_records() {
        let (dir, _) = app();
        let app = create_router(test_state(dir.path(), None));
        let (_, json) = get_json(app, "/predict?coin=legacy").await;
        assert_eq!(json["prediction"], "up");
        assert_eq!(json["last_price"], 100.0);

        let app = create_router(test_state(dir.path(), None));
        let (_, json) = get_json(app, "/signal?coin=legacy").await;
        assert_eq!(json, json!({ "signal": "buy", "change": 10.0 }));

        let app = create_router(test_state(dir.path(), None));
        let (_, json) = get_json(app, "/local-coin-data?coin=legacy").await;
        assert_eq!(json["price"], 100.0);
    }

    #[tokio::test]
    async fn test_short_bare_series_is_not_enough_data() {
        let (_dir, app) = app();
        let (_, json) = get_json(app, "/predict?coin=tiny").await;
        assert!(error_of(&json).contains("Not enough data"), "{}", json);
    }

    #[tokio::test]
    async fn test_bare_entries_that_are_read_are_malformed() {
        let (dir, _) = app();
        for uri in ["/signal?coin=mixed", "/local-coin-data?coin=mixed"] {
            let app = create_router(test_state(dir.path(), None));
            let (_, json) = get_json(app, uri).await;
            assert!(error_of(&json).contains("Malformed price data"), "{} -> {}", uri, json);
        }
    }

    #[tokio::test]
    async fn test_available_coins_ignores_models_and_fallback() {
        let (_dir, app) = app();
        let (_, json) = get_json(app, "/available-coins").await;
        assert_eq!(
            json,
            json!({ "coins": ["bitcoin", "empty", "legacy", "mixed", "nomodel", "short", "tiny"] })
        );
    }

    #[tokio::test]
    async fn test_debug_prices_accepts_both_forms() {
        let (_dir, app) = app();
        let (_, json) = get_json(app, "/debug-prices?coin=mixed").await;
        assert_eq!(json, json!({ "coin": "mixed", "last_60_prices": [1.0, 2.0, 3.5] }));
    }

    #[tokio::test]
    async fn test_debug_prices_tail_is_capped() {
        let (_dir, app) = app();
        let (_, json) = get_json(app, "/debug-prices?coin=bitcoin").await;
        let prices = json["last_60_prices"].as_array().unwrap();
        assert_eq!(prices.len(), 60);
        assert_eq!(prices[59], 100.0);
    }

    #[tokio::test]
    async fn test_signal() {
        let (_dir, app) = app();
        let (_, json) = get_json(app, "/signal?coin=bitcoin").await;
        assert_eq!(json, json!({ "signal": "buy", "change": 10.0 }));
    }

    #[tokio::test]
    async fn test_signal_not_enough_data() {
        let (_dir, app) = app();
        let (_, json) = get_json(app, "/signal?coin=empty").await;
        assert!(error_of(&json).contains("Not enough data"));
    }

    #[tokio::test]
    async fn test_local_coin_data() {
        let (_dir, app) = app();
        let (_, json) = get_json(app, "/local-coin-data?coin=bitcoin").await;
        assert_eq!(
            json,
            json!({
                "name": "Bitcoin",
                "symbol": "BIT",
                "price": 100.0,
                "market_cap": 0,
                "volume": 0,
                "circulating_supply": 0,
                "total_supply": 0,
                "homepage": "https://example.com"
            })
        );
    }

    #[tokio::test]
    async fn test_local_coin_data_empty() {
        let (_dir, app) = app();
        let (_, json) = get_json(app, "/local-coin-data?coin=empty").await;
        assert_eq!(json, json!({ "error": "No price data" }));
    }

    #[tokio::test]
    async fn test_proxy_markets_uses_fallback_when_offline() {
        let (_dir, app) = app();
        let (status, json) = get_json(app, "/proxy/markets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([{ "id": "bitcoin", "current_price": 100.0 }]));
    }

    #[tokio::test]
    async fn test_proxy_coin_error_when_offline() {
        let (_dir, app) = app();
        let (status, json) = get_json(app, "/proxy/coin/bitcoin").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn test_prediction_log_written() {
        let dir = TempDir::new().unwrap();
        fixture(dir.path());
        let log = Arc::new(CsvLogger::new(dir.path().join("predictions.csv")).unwrap());
        let app = create_router(test_state(dir.path(), Some(Arc::clone(&log))));

        get_json(app, "/predict?coin=bitcoin").await;

        let contents = fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains(",bitcoin,up,0.0500,105.00,100.00"));
    }
}
