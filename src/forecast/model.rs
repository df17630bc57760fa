// src/forecast/model.rs
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model artifact: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid model shape: {0}")]
    Shape(String),
    #[error("model expects input ({expected_steps}, {expected_features}), got ({steps}, {features})")]
    Input {
        expected_steps: usize,
        expected_features: usize,
        steps: usize,
        features: usize,
    },
    #[error("model produced a non-finite value")]
    NonFinite,
}

/// A batch-of-one input tensor of shape `(steps, features)`, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    steps: usize,
    features: usize,
    values: Vec<f64>,
}

impl Sequence {
    pub fn new(steps: usize, features: usize, values: Vec<f64>) -> Result<Self, ModelError> {
        if steps * features != values.len() {
            return Err(ModelError::Shape(format!(
                "{} values cannot form ({}, {})",
                values.len(),
                steps,
                features
            )));
        }
        Ok(Self { steps, features, values })
    }

    /// One observation per step.
    #[cfg(test)]
    pub fn univariate(values: Vec<f64>) -> Self {
        Self {
            steps: values.len(),
            features: 1,
            values,
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn features(&self) -> usize {
        self.features
    }

    pub fn step(&self, t: usize) -> &[f64] {
        &self.values[t * self.features..(t + 1) * self.features]
    }
}

/// A frozen forecaster: fixed-shape sequence in, fixed-length forecast out.
///
/// Implementations must be pure so one instance can serve concurrent requests.
pub trait SequenceModel: Send + Sync {
    fn window_size(&self) -> usize;
    fn n_features(&self) -> usize;
    fn horizon(&self) -> usize;
    fn predict(&self, input: &Sequence) -> Result<Vec<f64>, ModelError>;
}

/// JSON export of a trained network.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub window_size: usize,
    #[serde(default = "one_feature")]
    pub n_features: usize,
    pub horizon: usize,
    pub layers: Vec<Layer>,
}

fn one_feature() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Layer {
    Lstm(LstmLayer),
    Dense(DenseLayer),
    Flatten,
}

/// Weights in Keras layout, gates ordered input, forget, cell, output.
#[derive(Debug, Clone, Deserialize)]
pub struct LstmLayer {
    pub kernel: Vec<Vec<f64>>,
    pub recurrent_kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub return_sequences: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DenseLayer {
    pub kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::Relu => x.max(0.0),
            Self::Tanh => x.tanh(),
            Self::Sigmoid => sigmoid(x),
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Sequence { steps: usize, features: usize },
    Vector(usize),
}

enum Tensor {
    Sequence(Sequence),
    Vector(Vec<f64>),
}

// acc[k] += sum_i x[i] * w[i][k]
fn accumulate(acc: &mut [f64], x: &[f64], w: &[Vec<f64>]) {
    for (xi, row) in x.iter().zip(w) {
        for (a, wk) in acc.iter_mut().zip(row) {
            *a += xi * wk;
        }
    }
}

fn check_matrix(name: &str, m: &[Vec<f64>], rows: usize, cols: usize) -> Result<(), ModelError> {
    if m.len() != rows || m.iter().any(|r| r.len() != cols) {
        return Err(ModelError::Shape(format!(
            "{} must be {}x{}",
            name, rows, cols
        )));
    }
    Ok(())
}

impl LstmLayer {
    fn units(&self) -> usize {
        self.recurrent_kernel.len()
    }

    fn output_shape(&self, input: Shape) -> Result<Shape, ModelError> {
        let Shape::Sequence { steps, features } = input else {
            return Err(ModelError::Shape("lstm needs a sequence input".into()));
        };
        let units = self.units();
        if units == 0 {
            return Err(ModelError::Shape("lstm has no units".into()));
        }
        check_matrix("lstm kernel", &self.kernel, features, 4 * units)?;
        check_matrix("lstm recurrent_kernel", &self.recurrent_kernel, units, 4 * units)?;
        if self.bias.len() != 4 * units {
            return Err(ModelError::Shape(format!("lstm bias must have {} values", 4 * units)));
        }

        Ok(if self.return_sequences {
            Shape::Sequence { steps, features: units }
        } else {
            Shape::Vector(units)
        })
    }

    fn forward(&self, input: &Sequence) -> Tensor {
        let units = self.units();
        let mut h = vec![0.0; units];
        let mut c = vec![0.0; units];
        let mut outputs = Vec::new();

        for t in 0..input.steps() {
            let mut z = self.bias.clone();
            accumulate(&mut z, input.step(t), &self.kernel);
            accumulate(&mut z, &h, &self.recurrent_kernel);

            for k in 0..units {
                let i = sigmoid(z[k]);
                let f = sigmoid(z[units + k]);
                let g = z[2 * units + k].tanh();
                let o = sigmoid(z[3 * units + k]);
                c[k] = f * c[k] + i * g;
                h[k] = o * c[k].tanh();
            }
            if self.return_sequences {
                outputs.extend_from_slice(&h);
            }
        }

        if self.return_sequences {
            Tensor::Sequence(Sequence {
                steps: input.steps(),
                features: units,
                values: outputs,
            })
        } else {
            Tensor::Vector(h)
        }
    }
}

impl DenseLayer {
    fn output_shape(&self, input: Shape) -> Result<Shape, ModelError> {
        let Shape::Vector(n) = input else {
            return Err(ModelError::Shape("dense needs a flat input, add a flatten layer".into()));
        };
        if self.bias.is_empty() {
            return Err(ModelError::Shape("dense has no outputs".into()));
        }
        check_matrix("dense kernel", &self.kernel, n, self.bias.len())?;
        Ok(Shape::Vector(self.bias.len()))
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.bias.clone();
        accumulate(&mut out, input, &self.kernel);
        out.iter_mut().for_each(|v| *v = self.activation.apply(*v));
        out
    }
}

impl Layer {
    fn output_shape(&self, input: Shape) -> Result<Shape, ModelError> {
        match self {
            Self::Lstm(l) => l.output_shape(input),
            Self::Dense(d) => d.output_shape(input),
            Self::Flatten => Ok(match input {
                Shape::Sequence { steps, features } => Shape::Vector(steps * features),
                v @ Shape::Vector(_) => v,
            }),
        }
    }

    fn weights(&self) -> Box<dyn Iterator<Item = &f64> + '_> {
        match self {
            Self::Lstm(l) => Box::new(
                l.kernel
                    .iter()
                    .chain(&l.recurrent_kernel)
                    .flatten()
                    .chain(&l.bias),
            ),
            Self::Dense(d) => Box::new(d.kernel.iter().flatten().chain(&d.bias)),
            Self::Flatten => Box::new(std::iter::empty()),
        }
    }

    // Shapes were checked at load, so the mismatched arms are unreachable.
    fn forward(&self, input: Tensor) -> Result<Tensor, ModelError> {
        match (self, input) {
            (Self::Lstm(l), Tensor::Sequence(s)) => Ok(l.forward(&s)),
            (Self::Dense(d), Tensor::Vector(v)) => Ok(Tensor::Vector(d.forward(&v))),
            (Self::Flatten, Tensor::Sequence(s)) => Ok(Tensor::Vector(s.values)),
            (Self::Flatten, v @ Tensor::Vector(_)) => Ok(v),
            _ => Err(ModelError::Shape("layer received an unexpected tensor".into())),
        }
    }
}

/// Feed-forward evaluation of an exported LSTM/Dense stack.
#[derive(Debug, Clone)]
pub struct SequenceForecaster {
    window_size: usize,
    n_features: usize,
    horizon: usize,
    layers: Vec<Layer>,
}

impl SequenceForecaster {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ModelError> {
        if artifact.window_size == 0 || artifact.n_features == 0 || artifact.horizon == 0 {
            return Err(ModelError::Shape("window, features and horizon must be positive".into()));
        }
        if artifact.layers.is_empty() {
            return Err(ModelError::Shape("model has no layers".into()));
        }

        let mut shape = Shape::Sequence {
            steps: artifact.window_size,
            features: artifact.n_features,
        };
        for (i, layer) in artifact.layers.iter().enumerate() {
            shape = layer.output_shape(shape).map_err(|e| match e {
                ModelError::Shape(msg) => ModelError::Shape(format!("layer {}: {}", i, msg)),
                other => other,
            })?;
            if layer.weights().any(|w| !w.is_finite()) {
                return Err(ModelError::Shape(format!("layer {}: non-finite weight", i)));
            }
        }
        if shape != Shape::Vector(artifact.horizon) {
            return Err(ModelError::Shape(format!(
                "output is {:?}, expected a vector of {}",
                shape, artifact.horizon
            )));
        }

        Ok(Self {
            window_size: artifact.window_size,
            n_features: artifact.n_features,
            horizon: artifact.horizon,
            layers: artifact.layers,
        })
    }
}

impl SequenceModel for SequenceForecaster {
    fn window_size(&self) -> usize {
        self.window_size
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn horizon(&self) -> usize {
        self.horizon
    }

    fn predict(&self, input: &Sequence) -> Result<Vec<f64>, ModelError> {
        if input.steps() != self.window_size || input.features() != self.n_features {
            return Err(ModelError::Input {
                expected_steps: self.window_size,
                expected_features: self.n_features,
                steps: input.steps(),
                features: input.features(),
            });
        }

        let mut tensor = Tensor::Sequence(input.clone());
        for layer in &self.layers {
            tensor = layer.forward(tensor)?;
        }

        match tensor {
            Tensor::Vector(out) if out.len() == self.horizon => {
                if out.iter().all(|v| v.is_finite()) {
                    Ok(out)
                } else {
                    Err(ModelError::NonFinite)
                }
            }
            _ => Err(ModelError::Shape("model output does not match horizon".into())),
        }
    }
}
