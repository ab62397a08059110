use std::path::PathBuf;

/// Failures raised by the price store, the model registry and the inference
/// pipeline. The API layer turns every variant into an `{ "error": .. }` body.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No {kind} found for '{symbol}'")]
    NotFound { kind: &'static str, symbol: String },

    #[error("Malformed price data for '{symbol}': {reason}")]
    MalformedData { symbol: String, reason: String },

    #[error("Corrupt artifact {}: {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("Not enough data. Minimum {required} prices required, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Input shape {actual:?} does not match model input {expected:?}")]
    InputShape { expected: Vec<usize>, actual: Vec<usize> },

    #[error("Unexpected prediction shape: {0:?}")]
    UnexpectedOutputShape(Vec<usize>),

    #[error("Degenerate input: last price is {0}, confidence is undefined")]
    DegenerateInput(f64),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl PipelineError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::CorruptArtifact {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(symbol: &str, reason: impl ToString) -> Self {
        PipelineError::MalformedData {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_message() {
        let err = PipelineError::InsufficientData { required: 60, actual: 12 };
        assert_eq!(
            err.to_string(),
            "Not enough data. Minimum 60 prices required, got 12"
        );
    }

    #[test]
    fn test_shape_message() {
        let err = PipelineError::UnexpectedOutputShape(vec![1, 3]);
        assert_eq!(err.to_string(), "Unexpected prediction shape: [1, 3]");
    }

    #[test]
    fn test_not_found_message() {
        let err = PipelineError::NotFound { kind: "price data", symbol: "dogecoin".into() };
        assert_eq!(err.to_string(), "No price data found for 'dogecoin'");
    }
}
