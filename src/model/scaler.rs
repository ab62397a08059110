//! Fitted min-max scaler, read-only at serving time.

use ndarray::{Array1, Array2, Axis};
use serde::Deserialize;
use std::path::Path;

use crate::error::PipelineError;

#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    #[serde(default = "default_feature_range")]
    feature_range: [f64; 2],
    data_min: Vec<f64>,
    data_max: Vec<f64>,
}

fn default_feature_range() -> [f64; 2] {
    [0.0, 1.0]
}

/// Per-feature affine map `x * scale + min` onto `feature_range`.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    scale: Array1<f64>,
    min: Array1<f64>,
}

impl MinMaxScaler {
    pub fn fit(data_min: &[f64], data_max: &[f64], feature_range: (f64, f64)) -> Result<Self, String> {
        if data_min.len() != data_max.len() || data_min.is_empty() {
            return Err(format!(
                "data_min has {} features, data_max has {}",
                data_min.len(),
                data_max.len()
            ));
        }
        let (lo, hi) = feature_range;
        if !(hi > lo) {
            return Err(format!("invalid feature_range ({}, {})", lo, hi));
        }

        let mut scale = Array1::zeros(data_min.len());
        let mut min = Array1::zeros(data_min.len());
        for (i, (&dmin, &dmax)) in data_min.iter().zip(data_max).enumerate() {
            if !dmin.is_finite() || !dmax.is_finite() || dmax < dmin {
                return Err(format!("invalid data range [{}, {}] for feature {}", dmin, dmax, i));
            }
            let range = dmax - dmin;
            // zero-range features map through a unit range
            let range = if range == 0.0 { 1.0 } else { range };
            scale[i] = (hi - lo) / range;
            min[i] = lo - dmin * scale[i];
        }

        Ok(Self { scale, min })
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let contents = std::fs::read_to_string(path)?;
        let artifact: ScalerArtifact =
            serde_json::from_str(&contents).map_err(|e| PipelineError::corrupt(path, e))?;
        let [lo, hi] = artifact.feature_range;
        Self::fit(&artifact.data_min, &artifact.data_max, (lo, hi))
            .map_err(|reason| PipelineError::corrupt(path, reason))
    }

    pub fn n_features(&self) -> usize {
        self.scale.len()
    }

    /// Scale a `(samples, features)` matrix.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, PipelineError> {
        self.check_features(x)?;
        Ok(x * &self.scale.view().insert_axis(Axis(0)) + &self.min.view().insert_axis(Axis(0)))
    }

    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>, PipelineError> {
        self.check_features(x)?;
        Ok((x - &self.min.view().insert_axis(Axis(0))) / &self.scale.view().insert_axis(Axis(0)))
    }

    fn check_features(&self, x: &Array2<f64>) -> Result<(), PipelineError> {
        if x.ncols() != self.n_features() {
            return Err(PipelineError::InputShape {
                expected: vec![self.n_features()],
                actual: vec![x.ncols()],
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::Rng;

    #[test]
    fn test_transform_maps_range() {
        let scaler = MinMaxScaler::fit(&[100.0], &[200.0], (0.0, 1.0)).unwrap();
        let scaled = scaler.transform(&array![[100.0], [150.0], [200.0]]).unwrap();
        assert_eq!(scaled, array![[0.0], [0.5], [1.0]]);
    }

    #[test]
    fn test_custom_feature_range() {
        let scaler = MinMaxScaler::fit(&[0.0], &[10.0], (-1.0, 1.0)).unwrap();
        let scaled = scaler.transform(&array![[0.0], [5.0], [10.0]]).unwrap();
        assert!((scaled[[0, 0]] + 1.0).abs() < 1e-12);
        assert!(scaled[[1, 0]].abs() < 1e-12);
        assert!((scaled[[2, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_range_feature() {
        let scaler = MinMaxScaler::fit(&[5.0], &[5.0], (0.0, 1.0)).unwrap();
        let scaled = scaler.transform(&array![[5.0], [6.0]]).unwrap();
        assert_eq!(scaled, array![[0.0], [1.0]]);
    }

    #[test]
    fn test_round_trip_random_windows() {
        let mut rng = rand::thread_rng();
        let scaler = MinMaxScaler::fit(&[20_000.0], &[70_000.0], (0.0, 1.0)).unwrap();
        for _ in 0..50 {
            let window = Array2::from_shape_fn((60, 1), |_| rng.gen_range(1.0..100_000.0));
            let restored = scaler
                .inverse_transform(&scaler.transform(&window).unwrap())
                .unwrap();
            for (a, b) in window.iter().zip(restored.iter()) {
                assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
            }
        }
    }

    #[test]
    fn test_feature_mismatch() {
        let scaler = MinMaxScaler::fit(&[0.0], &[1.0], (0.0, 1.0)).unwrap();
        match scaler.transform(&array![[1.0, 2.0]]) {
            Err(PipelineError::InputShape { expected, actual }) => {
                assert_eq!(expected, vec![1]);
                assert_eq!(actual, vec![2]);
            }
            other => panic!("expected InputShape, got {:?}", other),
        }
        assert!(matches!(
            scaler.inverse_transform(&array![[1.0, 2.0, 3.0]]),
            Err(PipelineError::InputShape { .. })
        ));
    }

    #[test]
    fn test_invalid_fit() {
        assert!(MinMaxScaler::fit(&[2.0], &[1.0], (0.0, 1.0)).is_err());
        assert!(MinMaxScaler::fit(&[0.0], &[1.0], (1.0, 1.0)).is_err());
        assert!(MinMaxScaler::fit(&[0.0, 1.0], &[1.0], (0.0, 1.0)).is_err());
    }
}
