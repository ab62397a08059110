use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Query string of every per-coin endpoint.
#[derive(Debug, Deserialize)]
pub struct CoinQuery {
    #[serde(alias = "symbol")]
    pub coin: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Success payload or `{ "error": .. }`, both served with 200 OK so clients
/// handle a single status.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    Ok(T),
    Err(ErrorResponse),
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Display) -> Self {
        ApiResponse::Err(ErrorResponse { error: message.to_string() })
    }
}

impl<T, E: Display> From<Result<T, E>> for ApiResponse<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(body) => ApiResponse::Ok(body),
            Err(e) => ApiResponse::error(e),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CoinsResponse {
    pub coins: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DebugPricesResponse {
    pub coin: String,
    pub last_60_prices: Vec<f64>,
}
