use serde::Serialize;

use crate::data::price_store::PriceStore;
use crate::error::PipelineError;
use crate::inference::pipeline::round_to;

/// Moves smaller than this (in absolute price units) are a hold.
pub const HOLD_BAND: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalReport {
    pub signal: Signal,
    pub change: f64,
}

pub fn classify(change: f64) -> Signal {
    if change.abs() < HOLD_BAND {
        Signal::Hold
    } else if change > 0.0 {
        Signal::Buy
    } else {
        Signal::Sell
    }
}

/// Buy/sell/hold from the last two stored prices.
pub fn latest_signal(store: &dyn PriceStore, symbol: &str) -> Result<SignalReport, PipelineError> {
    let series = store.load(symbol)?;
    if series.len() < 2 {
        return Err(PipelineError::InsufficientData { required: 2, actual: series.len() });
    }

    let last_two = series
        .tail_records(2)
        .map_err(|reason| PipelineError::malformed(symbol, reason))?;
    let change = last_two[1] - last_two[0];

    Ok(SignalReport {
        signal: classify(change),
        change: round_to(change, 4),
    })
}
