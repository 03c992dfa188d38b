use crate::error::{EsnError, Result};
use nalgebra::DVector;

pub const EPSILON: f64 = 1e-7;

// Exponentially decaying estimate of the mean and mean absolute deviation of the state.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningNormalizer {
    rate: f64,
    mean: DVector<f64>,
    deviation: DVector<f64>,
}

impl RunningNormalizer {
    pub fn new(size: usize, rate: f64) -> Self {
        Self {
            rate,
            mean: DVector::zeros(size),
            deviation: DVector::from_element(size, 1.),
        }
    }

    pub fn with_statistics(
        rate: f64,
        mean: DVector<f64>,
        deviation: DVector<f64>,
    ) -> Result<Self> {
        if mean.len() != deviation.len() {
            return Err(EsnError::DimensionMismatch {
                what: "deviation",
                expected: mean.len(),
                actual: deviation.len(),
            });
        }
        Ok(Self {
            rate,
            mean,
            deviation,
        })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn deviation(&self) -> &DVector<f64> {
        &self.deviation
    }

    /// Whitens `x` with the current statistics, then advances them towards `x`.
    pub fn normalize(&mut self, x: &DVector<f64>) -> DVector<f64> {
        let delta = x - &self.mean;
        let whitened = delta.zip_map(&self.deviation, |d, dev| d / (dev + EPSILON));
        let rate = self.rate;
        self.mean += &delta * rate;
        self.deviation
            .zip_apply(&delta, |dev, d| *dev += (d.abs() - *dev) * rate);
        whitened
    }
}
