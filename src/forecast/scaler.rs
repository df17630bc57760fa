// src/forecast/scaler.rs
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScalerError {
    #[error("failed to read scaler artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scaler artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid scaler parameters: {0}")]
    Invalid(String),
    #[error("scaler expects {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },
    #[error("data length {len} is not a multiple of {n_features} features")]
    Ragged { len: usize, n_features: usize },
}

/// A fitted per-feature affine transform.
///
/// `MinMax` stores the `scale_`/`min_` pair produced by a min-max fit
/// (`x' = x * scale + min`), `Standard` stores mean and standard deviation
/// (`x' = (x - mean) / scale`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    MinMax { scale: Vec<f64>, min: Vec<f64> },
    Standard { mean: Vec<f64>, scale: Vec<f64> },
}

impl Scaler {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScalerError> {
        let raw = std::fs::read_to_string(path)?;
        let scaler: Scaler = serde_json::from_str(&raw)?;
        scaler.validate()?;
        Ok(scaler)
    }

    pub fn n_features(&self) -> usize {
        match self {
            Self::MinMax { scale, .. } | Self::Standard { scale, .. } => scale.len(),
        }
    }

    /// Scales a row-major matrix with `n_features` columns.
    pub fn transform(&self, data: &[f64], n_features: usize) -> Result<Vec<f64>, ScalerError> {
        self.check_shape(data, n_features)?;
        Ok(data
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let j = i % n_features;
                match self {
                    Self::MinMax { scale, min } => x * scale[j] + min[j],
                    Self::Standard { mean, scale } => (x - mean[j]) / scale[j],
                }
            })
            .collect())
    }

    pub fn inverse_transform(
        &self,
        data: &[f64],
        n_features: usize,
    ) -> Result<Vec<f64>, ScalerError> {
        self.check_shape(data, n_features)?;
        Ok(data
            .iter()
            .enumerate()
            .map(|(i, x)| {
                let j = i % n_features;
                match self {
                    Self::MinMax { scale, min } => (x - min[j]) / scale[j],
                    Self::Standard { mean, scale } => x * scale[j] + mean[j],
                }
            })
            .collect())
    }

    pub(crate) fn validate(&self) -> Result<(), ScalerError> {
        let (scale, offset) = match self {
            Self::MinMax { scale, min } => (scale, min),
            Self::Standard { mean, scale } => (scale, mean),
        };
        if scale.is_empty() {
            return Err(ScalerError::Invalid("no features".into()));
        }
        if scale.len() != offset.len() {
            return Err(ScalerError::Invalid(format!(
                "{} scale values but {} offsets",
                scale.len(),
                offset.len()
            )));
        }
        if scale.iter().chain(offset).any(|v| !v.is_finite()) {
            return Err(ScalerError::Invalid("non-finite parameter".into()));
        }
        if scale.iter().any(|s| *s == 0.0) {
            return Err(ScalerError::Invalid("zero scale".into()));
        }
        Ok(())
    }

    fn check_shape(&self, data: &[f64], n_features: usize) -> Result<(), ScalerError> {
        if n_features != self.n_features() {
            return Err(ScalerError::FeatureMismatch {
                expected: self.n_features(),
                got: n_features,
            });
        }
        if data.len() % n_features != 0 {
            return Err(ScalerError::Ragged {
                len: data.len(),
                n_features,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn approx(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn min_max_maps_fitted_range_to_unit_interval() {
        // fitted on [100, 300]
        let scaler = Scaler::MinMax {
            scale: vec![1.0 / 200.0],
            min: vec![-0.5],
        };
        let out = scaler.transform(&[100.0, 200.0, 300.0], 1).unwrap();
        assert!(approx(&out, &[0.0, 0.5, 1.0]));
    }

    #[test]
    fn columns_use_their_own_parameters() {
        let scaler = Scaler::Standard {
            mean: vec![10.0, 0.0],
            scale: vec![2.0, 4.0],
        };
        let out = scaler.transform(&[12.0, 8.0, 8.0, -4.0], 2).unwrap();
        assert!(approx(&out, &[1.0, 2.0, -1.0, -1.0]));
    }

    #[test]
    fn inverse_undoes_transform() {
        let scalers = [
            Scaler::MinMax {
                scale: vec![0.004, 0.5, 3.0],
                min: vec![-0.2, 1.0, 0.0],
            },
            Scaler::Standard {
                mean: vec![1500.0, -3.0, 0.25],
                scale: vec![320.0, 0.1, 7.0],
            },
        ];
        let data = [1250.5, 12.0, -7.75, 0.0, 99999.0, 3.14159];
        for scaler in &scalers {
            let scaled = scaler.transform(&data, 3).unwrap();
            let back = scaler.inverse_transform(&scaled, 3).unwrap();
            assert!(approx(&back, &data), "{:?}", scaler);
        }
    }

    #[test]
    fn rejects_wrong_width_and_ragged_data() {
        let scaler = Scaler::MinMax {
            scale: vec![1.0, 1.0],
            min: vec![0.0, 0.0],
        };
        assert!(matches!(
            scaler.transform(&[1.0, 2.0], 1),
            Err(ScalerError::FeatureMismatch { expected: 2, got: 1 })
        ));
        assert!(matches!(
            scaler.inverse_transform(&[1.0, 2.0, 3.0], 2),
            Err(ScalerError::Ragged { len: 3, n_features: 2 })
        ));
    }

    #[test]
    fn load_reads_json_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"kind":"min_max","scale":[0.01],"min":[-1.0]}}"#).unwrap();

        let scaler = Scaler::load(file.path()).unwrap();
        assert_eq!(scaler.n_features(), 1);
        assert!(approx(&scaler.transform(&[100.0], 1).unwrap(), &[0.0]));
    }

    #[test]
    fn load_rejects_degenerate_parameters() {
        let cases = [
            r#"{"kind":"min_max","scale":[0.0],"min":[0.0]}"#,
            r#"{"kind":"standard","mean":[1.0, 2.0],"scale":[1.0]}"#,
            r#"{"kind":"standard","mean":[],"scale":[]}"#,
        ];
        for body in cases {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(body.as_bytes()).unwrap();
            assert!(
                matches!(Scaler::load(file.path()), Err(ScalerError::Invalid(_))),
                "{}",
                body
            );
        }
    }
}
