// src/forecast/pipeline.rs
use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use thiserror::Error;

use super::model::{ModelError, Sequence, SequenceForecaster, SequenceModel};
use super::scaler::{Scaler, ScalerError};
use crate::config::ArtifactPaths;

const INPUT_KEY: &str = "data_terakhir";

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Scaler(#[from] ScalerError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("artifacts do not fit together: {0}")]
    Mismatch(String),
}

/// Result of one forecast call.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub values: Vec<f64>,
    pub generated_at: NaiveDateTime,
}

// The list key carries the horizon: {"prediksi_7_hari_kedepan": [...], "timestamp": "..."}
impl Serialize for Forecast {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(
            &format!("prediksi_{}_hari_kedepan", self.values.len()),
            &self.values,
        )?;
        map.serialize_entry(
            "timestamp",
            &self.generated_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        )?;
        map.end()
    }
}

/// validate → scale → reshape → infer → inverse-scale → format, bound to one
/// model and its scaler pair.
pub struct ForecastPipeline {
    model: Box<dyn SequenceModel>,
    scaler_x: Scaler,
    scaler_y: Scaler,
}

impl std::fmt::Debug for ForecastPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForecastPipeline")
            .field("window_size", &self.window_size())
            .field("horizon", &self.horizon())
            .finish()
    }
}

impl ForecastPipeline {
    pub fn new(
        model: Box<dyn SequenceModel>,
        scaler_x: Scaler,
        scaler_y: Scaler,
    ) -> Result<Self, ForecastError> {
        scaler_x.validate()?;
        scaler_y.validate()?;
        if model.n_features() != 1 {
            return Err(ForecastError::Mismatch(format!(
                "model takes {} features per step, windows are univariate",
                model.n_features()
            )));
        }
        if scaler_x.n_features() != model.n_features() {
            return Err(ForecastError::Mismatch(format!(
                "input scaler has {} features, model takes {}",
                scaler_x.n_features(),
                model.n_features()
            )));
        }
        if scaler_y.n_features() != model.horizon() {
            return Err(ForecastError::Mismatch(format!(
                "output scaler has {} features, model predicts {}",
                scaler_y.n_features(),
                model.horizon()
            )));
        }
        Ok(Self {
            model,
            scaler_x,
            scaler_y,
        })
    }

    pub fn load(paths: &ArtifactPaths) -> Result<Self, ForecastError> {
        let model = SequenceForecaster::load(&paths.model)?;
        let scaler_x = Scaler::load(&paths.scaler_x)?;
        let scaler_y = Scaler::load(&paths.scaler_y)?;
        Self::new(Box::new(model), scaler_x, scaler_y)
    }

    pub fn window_size(&self) -> usize {
        self.model.window_size()
    }

    pub fn horizon(&self) -> usize {
        self.model.horizon()
    }

    /// Validates a request body and runs the forecast. `None` means the body was
    /// missing or not JSON.
    pub fn predict_json(&self, body: Option<&Value>) -> Result<Forecast, ForecastError> {
        let window = validate_window(body, self.window_size())?;
        self.run(&window)
    }

    pub fn run(&self, window: &[f64]) -> Result<Forecast, ForecastError> {
        let w = self.window_size();
        if window.len() != w {
            return Err(ForecastError::InvalidInput(wrong_window_message(w)));
        }

        let scaled = self.scaler_x.transform(window, self.model.n_features())?;
        let input = Sequence::new(w, self.model.n_features(), scaled)?;
        let predicted = self.model.predict(&input)?;
        if predicted.len() != self.horizon() {
            return Err(ModelError::Shape(format!(
                "model returned {} values, expected {}",
                predicted.len(),
                self.horizon()
            ))
            .into());
        }
        let values = self.scaler_y.inverse_transform(&predicted, self.horizon())?;

        Ok(Forecast {
            values,
            generated_at: chrono::Local::now().naive_local(),
        })
    }
}

fn wrong_window_message(window_size: usize) -> String {
    format!(
        "Key \"{}\" harus berisi list dengan {} angka",
        INPUT_KEY, window_size
    )
}

/// Extracts exactly `window_size` finite numbers from `{"data_terakhir": [...]}`.
pub fn validate_window(body: Option<&Value>, window_size: usize) -> Result<Vec<f64>, ForecastError> {
    let Some(raw) = body.and_then(|b| b.get(INPUT_KEY)) else {
        return Err(ForecastError::InvalidInput(format!(
            "Input JSON harus berisi key \"{}\"",
            INPUT_KEY
        )));
    };

    let values = raw
        .as_array()
        .filter(|items| items.len() == window_size)
        .and_then(|items| {
            items
                .iter()
                .map(|v| v.as_f64().filter(|x| x.is_finite()))
                .collect::<Option<Vec<f64>>>()
        });

    values.ok_or_else(|| ForecastError::InvalidInput(wrong_window_message(window_size)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const W: usize = 30;
    const F: usize = 7;

    /// Returns the last `horizon` scaled inputs unchanged.
    struct TailModel {
        calls: Arc<AtomicUsize>,
    }

    impl SequenceModel for TailModel {
        fn window_size(&self) -> usize {
            W
        }
        fn n_features(&self) -> usize {
            1
        }
        fn horizon(&self) -> usize {
            F
        }
        fn predict(&self, input: &Sequence) -> Result<Vec<f64>, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((W - F..W).map(|t| input.step(t)[0]).collect())
        }
    }

    fn pipeline() -> (ForecastPipeline, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let model = TailModel {
            calls: Arc::clone(&calls),
        };
        // both scalers fitted on [0, 200]
        let scaler_x = Scaler::MinMax {
            scale: vec![0.005],
            min: vec![0.0],
        };
        let scaler_y = Scaler::MinMax {
            scale: vec![0.005; F],
            min: vec![0.0; F],
        };
        let pipeline = ForecastPipeline::new(Box::new(model), scaler_x, scaler_y).unwrap();
        (pipeline, calls)
    }

    fn history(n: usize) -> Vec<f64> {
        (0..n).map(|i| 10.0 + i as f64 * 1.5).collect()
    }

    #[test]
    fn valid_window_yields_full_horizon() {
        let (pipeline, calls) = pipeline();
        let forecast = pipeline
            .predict_json(Some(&json!({ "data_terakhir": history(W) })))
            .unwrap();

        assert_eq!(forecast.values.len(), F);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn identity_inference_round_trips_through_scalers() {
        let (pipeline, _) = pipeline();
        let input = history(W);
        let forecast = pipeline.run(&input).unwrap();

        for (got, want) in forecast.values.iter().zip(&input[W - F..]) {
            assert!((got - want).abs() < 1e-9, "{} vs {}", got, want);
        }
    }

    #[test]
    fn wrong_length_short_circuits_before_inference() {
        let (pipeline, calls) = pipeline();
        for n in [0, W - 1, W + 1] {
            let err = pipeline
                .predict_json(Some(&json!({ "data_terakhir": history(n) })))
                .unwrap_err();
            match err {
                ForecastError::InvalidInput(msg) => assert!(msg.contains("30 angka"), "{}", msg),
                other => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_key_or_body_names_the_key() {
        for body in [None, Some(json!({})), Some(json!([1, 2, 3])), Some(json!({"data": [1]}))] {
            let err = validate_window(body.as_ref(), W).unwrap_err();
            assert!(err.to_string().contains("data_terakhir"), "{}", err);
        }
    }

    #[test]
    fn non_numeric_elements_are_rejected() {
        let mut values: Vec<Value> = history(W).into_iter().map(Value::from).collect();
        values[3] = json!("12");
        let err = validate_window(Some(&json!({ "data_terakhir": values })), W).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));

        let err = validate_window(Some(&json!({ "data_terakhir": "1,2,3" })), W).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidInput(_)));
    }

    #[test]
    fn integers_are_accepted_as_numbers() {
        let values: Vec<i64> = (0..W as i64).collect();
        let window = validate_window(Some(&json!({ "data_terakhir": values })), W).unwrap();
        assert_eq!(window[29], 29.0);
    }

    #[test]
    fn construction_checks_scaler_widths() {
        let model = TailModel {
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let scaler_x = Scaler::MinMax {
            scale: vec![1.0],
            min: vec![0.0],
        };
        let scaler_y = Scaler::MinMax {
            scale: vec![1.0; F - 1],
            min: vec![0.0; F - 1],
        };
        let err = ForecastPipeline::new(Box::new(model), scaler_x, scaler_y).unwrap_err();
        assert!(matches!(err, ForecastError::Mismatch(_)));
    }

    #[test]
    fn construction_rejects_malformed_scalers() {
        let model = || {
            Box::new(TailModel {
                calls: Arc::new(AtomicUsize::new(0)),
            })
        };
        let scaler_y = Scaler::MinMax {
            scale: vec![1.0; F],
            min: vec![0.0; F],
        };

        let missing_offsets = Scaler::MinMax {
            scale: vec![1.0],
            min: vec![],
        };
        let err = ForecastPipeline::new(model(), missing_offsets, scaler_y.clone()).unwrap_err();
        assert!(matches!(err, ForecastError::Scaler(ScalerError::Invalid(_))), "{err:?}");

        let zero_scale = Scaler::Standard {
            mean: vec![0.0; F],
            scale: vec![0.0; F],
        };
        let scaler_x = Scaler::MinMax {
            scale: vec![1.0],
            min: vec![0.0],
        };
        let err = ForecastPipeline::new(model(), scaler_x, zero_scale).unwrap_err();
        assert!(matches!(err, ForecastError::Scaler(ScalerError::Invalid(_))), "{err:?}");
    }

    #[test]
    fn serializes_with_horizon_in_key() {
        let forecast = Forecast {
            values: vec![1.0, 2.5],
            generated_at: chrono::NaiveDate::from_ymd_opt(2024, 1, 31)
                .unwrap()
                .and_hms_micro_opt(8, 30, 0, 123_456)
                .unwrap(),
        };
        let value = serde_json::to_value(&forecast).unwrap();
        assert_eq!(
            value,
            json!({
                "prediksi_2_hari_kedepan": [1.0, 2.5],
                "timestamp": "2024-01-31T08:30:00.123456"
            })
        );
    }
}
