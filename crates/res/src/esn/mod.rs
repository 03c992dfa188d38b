pub mod activation;
pub mod normalizer;
pub mod weights;

use crate::error::{EsnError, Result};
use activation::Activation;
use nalgebra::DVector;
use normalizer::RunningNormalizer;
use rand::{Rng, thread_rng};
use tracing::debug;
use weights::Weights;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EsnParameters {
    pub size: usize,
    pub density: f64,
    pub spectral_radius: f64,
    pub bias: bool,
    pub activation: Activation,
    pub norm_rate: Option<f64>,
}

impl EsnParameters {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            density: 0.1,
            spectral_radius: 0.95,
            bias: true,
            activation: Activation::Tanh,
            norm_rate: None,
        }
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_spectral_radius(mut self, spectral_radius: f64) -> Self {
        self.spectral_radius = spectral_radius;
        self
    }

    pub fn with_bias(mut self, bias: bool) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_norm_rate(mut self, norm_rate: Option<f64>) -> Self {
        self.norm_rate = norm_rate;
        self
    }

    /// Side length of the weight matrix, one larger than the state when the bias unit is on.
    pub fn weight_dim(&self) -> usize {
        if self.bias { self.size + 1 } else { self.size }
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(EsnError::Config("size must be at least 1".into()));
        }
        if !(self.density > 0. && self.density <= 1.) {
            return Err(EsnError::Config(format!(
                "density must be in (0, 1], got {}",
                self.density
            )));
        }
        if !(self.spectral_radius.is_finite() && self.spectral_radius > 0.) {
            return Err(EsnError::Config(format!(
                "spectral radius must be positive, got {}",
                self.spectral_radius
            )));
        }
        if let Some(rate) = self.norm_rate {
            if !(rate > 0. && rate < 1.) {
                return Err(EsnError::Config(format!(
                    "normalization rate must be in (0, 1), got {rate}"
                )));
            }
        }
        Ok(())
    }
}

// classical ESN without input weights: the state is written to directly between steps
#[derive(Debug, Clone)]
pub struct Esn {
    params: EsnParameters,
    weights: Weights,
    state: DVector<f64>,
    normalizer: Option<RunningNormalizer>,
}

impl Esn {
    pub fn new(params: EsnParameters) -> Result<Self> {
        Self::with_rng(params, &mut thread_rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(params: EsnParameters, rng: &mut R) -> Result<Self> {
        let weights = weights::internal_weights(&params, rng)?;
        Ok(Self {
            params,
            weights,
            state: DVector::zeros(params.size),
            normalizer: params
                .norm_rate
                .map(|rate| RunningNormalizer::new(params.size, rate)),
        })
    }

    /// Rebuilds a reservoir from stored parts. Statistics are ignored when normalization is
    /// off and default to zero mean and unit deviation when it is on but none are given.
    pub fn from_parts(
        params: EsnParameters,
        weights: Weights,
        state: DVector<f64>,
        statistics: Option<(DVector<f64>, DVector<f64>)>,
    ) -> Result<Self> {
        params.validate()?;
        if !weights.is_square() || weights.dim() != params.weight_dim() {
            return Err(EsnError::DimensionMismatch {
                what: "weights",
                expected: params.weight_dim(),
                actual: weights.dim(),
            });
        }
        if state.len() != params.size {
            return Err(EsnError::DimensionMismatch {
                what: "state",
                expected: params.size,
                actual: state.len(),
            });
        }

        let normalizer = match (params.norm_rate, statistics) {
            (None, _) => None,
            (Some(rate), None) => Some(RunningNormalizer::new(params.size, rate)),
            (Some(rate), Some((mean, deviation))) => {
                if mean.len() != params.size {
                    return Err(EsnError::DimensionMismatch {
                        what: "mean",
                        expected: params.size,
                        actual: mean.len(),
                    });
                }
                Some(RunningNormalizer::with_statistics(rate, mean, deviation)?)
            }
        };

        Ok(Self {
            params,
            weights,
            state,
            normalizer,
        })
    }

    pub fn params(&self) -> &EsnParameters {
        &self.params
    }

    pub fn size(&self) -> usize {
        self.params.size
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn state(&self) -> &DVector<f64> {
        &self.state
    }

    /// Fixed-length view for external writers. Callers provide their own exclusion.
    pub fn state_mut(&mut self) -> &mut [f64] {
        self.state.as_mut_slice()
    }

    pub fn normalizer(&self) -> Option<&RunningNormalizer> {
        self.normalizer.as_ref()
    }

    /// One tick: normalize, append the bias unit, `x * W`, activation, strip the bias unit.
    pub fn step(&mut self) {
        let mut x = match self.normalizer.as_mut() {
            Some(normalizer) => normalizer.normalize(&self.state),
            None => self.state.clone(),
        };
        if self.params.bias {
            x = x.insert_row(self.params.size, 1.);
        }

        let mut y = self.weights.row_mul(&x);
        if let Some(f) = self.params.activation.function() {
            y.apply(|v| *v = f(*v));
        }

        if self.params.bias {
            y = y.rows(0, self.params.size).into_owned();
        }
        self.state = y;
    }

    pub fn reset(&mut self) {
        debug!(size = self.params.size, "resetting reservoir state");
        self.state.fill(0.);
    }
}
