//! Single-shot inference: price window in, direction and confidence out.
//!
//! 1. Load the symbol's series and require `window` points.
//! 2. Take the last `window` prices (records only) as a `(window, 1)` column.
//! 3. Scale, reshape to `(1, window, 1)`, run the model.
//! 4. Require exactly one output per sample, inverse-scale it.
//! 5. Compare against the last raw price.

use ndarray::Array2;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::data::price_store::PriceStore;
use crate::error::PipelineError;
use crate::model::registry::ModelRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Presentation-rounded forecast for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    #[serde(rename = "prediction")]
    pub direction: Direction,
    pub confidence: f64,
    pub predicted_price: f64,
    pub last_price: f64,
}

pub struct InferencePipeline {
    prices: Arc<dyn PriceStore>,
    models: Arc<dyn ModelRegistry>,
    window: usize,
}

impl InferencePipeline {
    pub fn new(prices: Arc<dyn PriceStore>, models: Arc<dyn ModelRegistry>, window: usize) -> Self {
        Self { prices, models, window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn predict(&self, symbol: &str) -> Result<InferenceResult, PipelineError> {
        let series = self.prices.load(symbol)?;
        if series.len() < self.window {
            return Err(PipelineError::InsufficientData {
                required: self.window,
                actual: series.len(),
            });
        }

        let prices = series
            .tail_records(self.window)
            .map_err(|reason| PipelineError::malformed(symbol, reason))?;
        let last_price = prices[prices.len() - 1];
        let window = Array2::from_shape_vec((self.window, 1), prices)
            .map_err(|e| PipelineError::malformed(symbol, e))?;

        let bundle = self.models.load(symbol)?;

        let scaled = bundle.scaler.transform(&window)?;
        let input = scaled
            .into_shape_with_order((1, self.window, 1))
            .map_err(|e| PipelineError::malformed(symbol, e))?;
        let output = bundle.model.predict(&input)?;

        let predicted_scaled = single_output(&output)?;
        let predicted_price =
            bundle.scaler.inverse_transform(&Array2::from_elem((1, 1), predicted_scaled))?[[0, 0]];

        debug!(
            "{}: scaled={:.6} predicted={:.4} last={:.4}",
            symbol, predicted_scaled, predicted_price, last_price
        );
        derive_result(predicted_price, last_price)
    }
}

fn single_output(output: &Array2<f64>) -> Result<f64, PipelineError> {
    if output.shape() != [1, 1] {
        return Err(PipelineError::UnexpectedOutputShape(output.shape().to_vec()));
    }
    Ok(output[[0, 0]])
}

/// Classify a prediction against the last observed price. Equality counts
/// as `Down`; a zero last price is rejected.
pub fn derive_result(predicted_price: f64, last_price: f64) -> Result<InferenceResult, PipelineError> {
    if last_price == 0.0 || !last_price.is_finite() || !predicted_price.is_finite() {
        return Err(PipelineError::DegenerateInput(last_price));
    }

    let direction = if predicted_price > last_price {
        Direction::Up
    } else {
        Direction::Down
    };
    let confidence = (predicted_price - last_price).abs() / last_price.abs();

    Ok(InferenceResult {
        direction,
        confidence: round_to(confidence, 4),
        predicted_price: round_to(predicted_price, 2),
        last_price: round_to(last_price, 2),
    })
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
