use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::PipelineError;
use crate::model::lstm::{LstmRegressor, Regressor};
use crate::model::scaler::MinMaxScaler;

/// A model and the scaler it was trained with.
pub struct ModelBundle {
    pub model: Box<dyn Regressor>,
    pub scaler: MinMaxScaler,
}

/// Resolves a symbol to its fitted model and scaler. Loading may block.
pub trait ModelRegistry: Send + Sync {
    fn load(&self, symbol: &str) -> Result<Arc<ModelBundle>, PipelineError>;
}

/// Registry over `<model_dir>/<symbol>.json` and `<model_dir>/<symbol>_scaler.json`.
pub struct FileModelRegistry {
    model_dir: PathBuf,
    window: usize,
    cache: Option<DashMap<String, Arc<ModelBundle>>>,
}

impl FileModelRegistry {
    pub fn new(model_dir: impl Into<PathBuf>, window: usize) -> Self {
        Self {
            model_dir: model_dir.into(),
            window,
            cache: None,
        }
    }

    /// Keep loaded bundles for the lifetime of the process. Artifacts are
    /// immutable per deployment, so entries are never invalidated.
    pub fn with_cache(mut self) -> Self {
        self.cache = Some(DashMap::new());
        self
    }

    pub fn cached(&self) -> usize {
        self.cache.as_ref().map(DashMap::len).unwrap_or(0)
    }

    fn read_bundle(&self, symbol: &str) -> Result<ModelBundle, PipelineError> {
        let model_path = self.model_dir.join(format!("{}.json", symbol));
        let scaler_path = self.model_dir.join(format!("{}_scaler.json", symbol));
        require(&model_path, "model", symbol)?;
        require(&scaler_path, "scaler", symbol)?;

        let model = LstmRegressor::load(&model_path)?;
        let scaler = MinMaxScaler::load(&scaler_path)?;

        let (window, features) = model.input_shape();
        if window != self.window {
            return Err(PipelineError::corrupt(
                &model_path,
                format!("model window is {}, service window is {}", window, self.window),
            ));
        }
        if features != scaler.n_features() {
            return Err(PipelineError::corrupt(
                &scaler_path,
                format!("scaler has {} features, model expects {}", scaler.n_features(), features),
            ));
        }

        info!("Loaded model for {} from {}", symbol, model_path.display());
        Ok(ModelBundle { model: Box::new(model), scaler })
    }
}

fn require(path: &Path, kind: &'static str, symbol: &str) -> Result<(), PipelineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::NotFound { kind, symbol: symbol.to_string() })
    }
}

impl ModelRegistry for FileModelRegistry {
    fn load(&self, symbol: &str) -> Result<Arc<ModelBundle>, PipelineError> {
        let Some(cache) = &self.cache else {
            return self.read_bundle(symbol).map(Arc::new);
        };

        if let Some(bundle) = cache.get(symbol) {
            return Ok(bundle.value().clone());
        }
        let bundle = Arc::new(self.read_bundle(symbol)?);
        cache.insert(symbol.to_string(), Arc::clone(&bundle));
        Ok(bundle)
    }
}
