//! Reservoir service configuration

use crate::error::{ContextError, Result};
use res::{Activation, EsnParameters};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything needed to build or restore the reservoir and to decide when to snapshot it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservoirConfig {
    /// Number of state units, excluding the bias unit
    pub size: usize,

    /// Fraction of non-zero weights
    pub density: f64,

    /// Spectral radius the weights are scaled to
    pub spectral_radius: f64,

    /// Append a constant unit before the transform
    pub bias: bool,

    pub activation: Activation,

    /// Enables streaming normalization at this rate
    pub norm_rate: Option<f64>,

    /// Snapshot location; without it nothing is loaded or saved
    pub model_path: Option<PathBuf>,

    /// Snapshot after every this many steps
    pub save_every: Option<u64>,
}

impl Default for ReservoirConfig {
    fn default() -> Self {
        Self {
            size: 1024,
            density: 0.1,
            spectral_radius: 0.99,
            bias: true,
            activation: Activation::Tanh,
            norm_rate: None,
            model_path: None,
            save_every: None,
        }
    }
}

impl ReservoirConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
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

    pub fn with_model_path(mut self, model_path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(model_path.into());
        self
    }

    pub fn with_save_every(mut self, save_every: Option<u64>) -> Self {
        self.save_every = save_every;
        self
    }

    pub fn esn_parameters(&self) -> EsnParameters {
        EsnParameters {
            size: self.size,
            density: self.density,
            spectral_radius: self.spectral_radius,
            bias: self.bias,
            activation: self.activation,
            norm_rate: self.norm_rate,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.esn_parameters().validate()?;
        if self.save_every == Some(0) {
            return Err(ContextError::InvalidConfig(
                "save_every must be at least 1".into(),
            ));
        }
        if self.save_every.is_some() && self.model_path.is_none() {
            return Err(ContextError::InvalidConfig(
                "save_every needs a model_path".into(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ContextError::InvalidConfig(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| ContextError::InvalidConfig(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod test {
    use super::ReservoirConfig;
    use crate::ContextError;
    use res::{Activation, EsnError};

    #[test]
    fn defaults_are_valid() {
        let config = ReservoirConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.esn_parameters().weight_dim(), 1025);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reservoir.json");
        std::fs::write(&path, r#"{"size": 64, "activation": "sigmoid", "norm_rate": 0.01}"#)
            .unwrap();
        let config = ReservoirConfig::from_file(&path).unwrap();
        assert_eq!(
            config,
            ReservoirConfig::default()
                .with_size(64)
                .with_activation(Activation::Sigmoid)
                .with_norm_rate(Some(0.01))
        );
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = ReservoirConfig::default().with_density(0.).validate().unwrap_err();
        assert!(matches!(err, ContextError::Esn(EsnError::Config(_))));

        let err = ReservoirConfig::default()
            .with_model_path("/tmp/reservoir.json")
            .with_save_every(Some(0))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ContextError::InvalidConfig(_)));

        let err = ReservoirConfig::default()
            .with_save_every(Some(10))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ContextError::InvalidConfig(_)));
    }
}
