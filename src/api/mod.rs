pub mod dto;
pub mod handlers;
pub mod router;

use std::sync::Arc;

use crate::data::market_proxy::MarketProxy;
use crate::data::price_store::PriceStore;
use crate::inference::pipeline::InferencePipeline;
use crate::monitoring::logger::CsvLogger;

pub use router::create_router;

/// Application state shared across handlers
pub struct AppState {
    pub pipeline: Arc<InferencePipeline>,
    pub prices: Arc<dyn PriceStore>,
    pub markets: Arc<MarketProxy>,
    pub prediction_log: Option<Arc<CsvLogger>>,
}
