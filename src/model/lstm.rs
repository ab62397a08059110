//! Stacked LSTM regressor evaluated with `ndarray`.
//!
//! Weights follow the Keras layout: gate order input, forget, cell, output;
//! kernels are `(inputs, 4 * units)`, recurrent kernels `(units, 4 * units)`.

use ndarray::{s, Array1, Array2, Array3, ArrayView2, Axis};
use serde::Deserialize;
use std::path::Path;

use crate::error::PipelineError;

/// A fitted sequence-to-one model.
pub trait Regressor: Send + Sync {
    /// Expected `(timesteps, features)` of one sample.
    fn input_shape(&self) -> (usize, usize);

    /// `(samples, timesteps, features)` in, `(samples, outputs)` out.
    fn predict(&self, input: &Array3<f64>) -> Result<Array2<f64>, PipelineError>;
}

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    window: usize,
    #[serde(default = "default_features")]
    features: usize,
    lstm: Vec<LstmArtifact>,
    dense: Vec<DenseArtifact>,
}

fn default_features() -> usize {
    1
}

#[derive(Debug, Deserialize)]
struct LstmArtifact {
    units: usize,
    kernel: Vec<Vec<f64>>,
    recurrent_kernel: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct DenseArtifact {
    kernel: Vec<Vec<f64>>,
    bias: Vec<f64>,
    #[serde(default)]
    activation: Activation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => sigmoid(x),
            Activation::Tanh => x.tanh(),
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone)]
pub struct LstmLayer {
    units: usize,
    kernel: Array2<f64>,
    recurrent_kernel: Array2<f64>,
    bias: Array1<f64>,
}

impl LstmLayer {
    pub fn new(
        kernel: Array2<f64>,
        recurrent_kernel: Array2<f64>,
        bias: Array1<f64>,
    ) -> Result<Self, String> {
        let units = recurrent_kernel.nrows();
        if units == 0 {
            return Err("LSTM layer has no units".to_string());
        }
        if recurrent_kernel.ncols() != 4 * units {
            return Err(format!(
                "recurrent kernel is {:?}, expected ({}, {})",
                recurrent_kernel.shape(),
                units,
                4 * units
            ));
        }
        if kernel.ncols() != 4 * units || bias.len() != 4 * units {
            return Err(format!(
                "kernel {:?} / bias {} do not match {} units",
                kernel.shape(),
                bias.len(),
                units
            ));
        }
        Ok(Self { units, kernel, recurrent_kernel, bias })
    }

    fn inputs(&self) -> usize {
        self.kernel.nrows()
    }

    /// Hidden state at every timestep, `(timesteps, units)`.
    fn forward(&self, seq: ArrayView2<f64>) -> Array2<f64> {
        let u = self.units;
        let projected = seq.dot(&self.kernel) + &self.bias;

        let mut h = Array1::<f64>::zeros(u);
        let mut c = Array1::<f64>::zeros(u);
        let mut out = Array2::<f64>::zeros((seq.nrows(), u));

        for (step, x_proj) in projected.outer_iter().enumerate() {
            let z = &x_proj + &h.dot(&self.recurrent_kernel);
            let i = z.slice(s![0..u]).mapv(sigmoid);
            let f = z.slice(s![u..2 * u]).mapv(sigmoid);
            let g = z.slice(s![2 * u..3 * u]).mapv(f64::tanh);
            let o = z.slice(s![3 * u..4 * u]).mapv(sigmoid);

            c = &f * &c + &i * &g;
            h = &o * &c.mapv(f64::tanh);
            out.row_mut(step).assign(&h);
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct DenseLayer {
    kernel: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

impl DenseLayer {
    pub fn new(kernel: Array2<f64>, bias: Array1<f64>, activation: Activation) -> Result<Self, String> {
        if kernel.ncols() != bias.len() {
            return Err(format!(
                "dense kernel {:?} does not match bias of length {}",
                kernel.shape(),
                bias.len()
            ));
        }
        Ok(Self { kernel, bias, activation })
    }

    fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        (x.dot(&self.kernel) + &self.bias).mapv(|v| self.activation.apply(v))
    }
}

#[derive(Debug, Clone)]
pub struct LstmRegressor {
    window: usize,
    features: usize,
    lstm: Vec<LstmLayer>,
    dense: Vec<DenseLayer>,
}

impl LstmRegressor {
    pub fn new(
        window: usize,
        features: usize,
        lstm: Vec<LstmLayer>,
        dense: Vec<DenseLayer>,
    ) -> Result<Self, String> {
        if lstm.is_empty() {
            return Err("model has no LSTM layers".to_string());
        }
        let mut width = features;
        for (idx, layer) in lstm.iter().enumerate() {
            if layer.inputs() != width {
                return Err(format!("LSTM layer {} expects {} inputs, got {}", idx, layer.inputs(), width));
            }
            width = layer.units;
        }
        for (idx, layer) in dense.iter().enumerate() {
            if layer.kernel.nrows() != width {
                return Err(format!("dense layer {} expects {} inputs, got {}", idx, layer.kernel.nrows(), width));
            }
            width = layer.kernel.ncols();
        }
        Ok(Self { window, features, lstm, dense })
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let contents = std::fs::read_to_string(path)?;
        let artifact: ModelArtifact =
            serde_json::from_str(&contents).map_err(|e| PipelineError::corrupt(path, e))?;
        Self::from_artifact(artifact).map_err(|reason| PipelineError::corrupt(path, reason))
    }

    fn from_artifact(artifact: ModelArtifact) -> Result<Self, String> {
        let lstm = artifact
            .lstm
            .into_iter()
            .map(|layer| {
                let kernel = to_matrix(layer.kernel, "kernel")?;
                let recurrent = to_matrix(layer.recurrent_kernel, "recurrent_kernel")?;
                if recurrent.nrows() != layer.units {
                    return Err(format!(
                        "layer declares {} units, recurrent kernel has {} rows",
                        layer.units,
                        recurrent.nrows()
                    ));
                }
                LstmLayer::new(kernel, recurrent, Array1::from(layer.bias))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let dense = artifact
            .dense
            .into_iter()
            .map(|layer| {
                DenseLayer::new(to_matrix(layer.kernel, "dense kernel")?, Array1::from(layer.bias), layer.activation)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(artifact.window, artifact.features, lstm, dense)
    }
}

impl Regressor for LstmRegressor {
    fn input_shape(&self) -> (usize, usize) {
        (self.window, self.features)
    }

    fn predict(&self, input: &Array3<f64>) -> Result<Array2<f64>, PipelineError> {
        let (_, timesteps, features) = input.dim();
        if (timesteps, features) != self.input_shape() {
            return Err(PipelineError::InputShape {
                expected: vec![self.window, self.features],
                actual: vec![timesteps, features],
            });
        }

        let last_units = self.lstm.last().map(|l| l.units).unwrap_or(0);
        let mut hidden = Array2::<f64>::zeros((input.len_of(Axis(0)), last_units));

        for (idx, sample) in input.outer_iter().enumerate() {
            let mut seq = sample.to_owned();
            for layer in &self.lstm {
                seq = layer.forward(seq.view());
            }
            if let Some(last) = seq.outer_iter().last() {
                hidden.row_mut(idx).assign(&last);
            }
        }

        Ok(self.dense.iter().fold(hidden, |x, layer| layer.forward(&x)))
    }
}

fn to_matrix(rows: Vec<Vec<f64>>, name: &str) -> Result<Array2<f64>, String> {
    let nrows = rows.len();
    let ncols = rows.first().map(Vec::len).unwrap_or(0);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(format!("{} rows have differing lengths", name));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat).map_err(|e| format!("{}: {}", name, e))
}
