use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::data::types::{PriceEntry, PricePoint, PriceSeries};
use crate::error::PipelineError;

/// Read-only access to per-symbol price series.
pub trait PriceStore: Send + Sync {
    /// Full series in stored order. Each point keeps the form it was stored
    /// in; callers that need records check only the points they read.
    fn load(&self, symbol: &str) -> Result<PriceSeries, PipelineError>;

    /// Symbols with a backing artifact, sorted.
    fn list_available(&self) -> Result<Vec<String>, PipelineError>;
}

/// Price store over a directory of `<symbol>.json` files.
pub struct JsonPriceStore {
    data_dir: PathBuf,
    reserved: Vec<String>,
}

impl JsonPriceStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            reserved: Vec::new(),
        }
    }

    /// Exclude a file living in the data directory (e.g. the markets
    /// fallback) from the symbol listing.
    pub fn with_reserved_file(mut self, path: &Path) -> Self {
        let in_data_dir = path
            .parent()
            .map(|parent| same_dir(parent, &self.data_dir))
            .unwrap_or(false);
        if in_data_dir {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                self.reserved.push(stem.to_string());
            }
        }
        self
    }

    fn artifact_path(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", symbol))
    }
}

/// `./data`, `data` and `data/` name the same directory. Canonical paths are
/// used when both exist so relative and absolute spellings also match.
fn same_dir(a: &Path, b: &Path) -> bool {
    if let (Ok(a), Ok(b)) = (a.canonicalize(), b.canonicalize()) {
        return a == b;
    }
    lexical(a) == lexical(b)
}

fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

impl PriceStore for JsonPriceStore {
    fn load(&self, symbol: &str) -> Result<PriceSeries, PipelineError> {
        let path = self.artifact_path(symbol);
        let contents = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PipelineError::NotFound {
                kind: "price data",
                symbol: symbol.to_string(),
            },
            _ => PipelineError::Storage(e),
        })?;

        let entries: Vec<PriceEntry> = serde_json::from_str(&contents)
            .map_err(|e| PipelineError::malformed(symbol, e))?;

        let points: Vec<PricePoint> = entries.into_iter().map(PricePoint::from).collect();

        debug!("Loaded {} prices for {}", points.len(), symbol);
        Ok(PriceSeries::new(points))
    }

    fn list_available(&self) -> Result<Vec<String>, PipelineError> {
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if !self.reserved.iter().any(|r| r == stem) {
                    symbols.push(stem.to_string());
                }
            }
        }
        symbols.sort();
        Ok(symbols)
    }
}
