pub mod model;
pub mod pipeline;
pub mod scaler;

pub use model::{SequenceForecaster, SequenceModel};
pub use pipeline::{Forecast, ForecastError, ForecastPipeline};
pub use scaler::Scaler;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Pemasukan,
    Pengeluaran,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pemasukan => "pemasukan",
            Self::Pengeluaran => "pengeluaran",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Pemasukan => "Pemasukan",
            Self::Pengeluaran => "Pengeluaran",
        }
    }

    pub fn unavailable_message(&self) -> String {
        format!("Model {} tidak tersedia di server.", self.title())
    }

    pub fn internal_error_message(&self) -> String {
        format!(
            "Terjadi kesalahan internal saat prediksi {}.",
            self.as_str()
        )
    }
}

/// Forecast pipelines built once at startup and shared read-only by every request.
/// A signal without a pipeline stays unavailable until the process restarts.
#[derive(Debug, Default)]
pub struct ForecastContext {
    pemasukan: Option<ForecastPipeline>,
    pengeluaran: Option<ForecastPipeline>,
}

impl ForecastContext {
    pub fn new(pemasukan: Option<ForecastPipeline>, pengeluaran: Option<ForecastPipeline>) -> Self {
        Self {
            pemasukan,
            pengeluaran,
        }
    }

    pub fn load(config: &Config) -> Self {
        let load = |signal: Signal| {
            let paths = config.artifacts(signal);
            match ForecastPipeline::load(paths) {
                Ok(pipeline) => {
                    tracing::info!(
                        signal = signal.as_str(),
                        window_size = pipeline.window_size(),
                        horizon = pipeline.horizon(),
                        "forecast model loaded"
                    );
                    Some(pipeline)
                }
                Err(e) => {
                    tracing::warn!(
                        signal = signal.as_str(),
                        model = %paths.model.display(),
                        error = %e,
                        "forecast model unavailable, endpoint will answer 503"
                    );
                    None
                }
            }
        };

        Self::new(load(Signal::Pemasukan), load(Signal::Pengeluaran))
    }

    pub fn pipeline(&self, signal: Signal) -> Option<&ForecastPipeline> {
        match signal {
            Signal::Pemasukan => self.pemasukan.as_ref(),
            Signal::Pengeluaran => self.pengeluaran.as_ref(),
        }
    }
}
