use clap::{Parser, builder::BoolishValueParser};
use res::Activation;
use res_context::ReservoirConfig;
use std::path::PathBuf;

/// Reservoir server: read, write and step a shared echo state network over HTTP
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 80)]
    pub port: u16,

    /// JSON configuration file; flags and environment variables override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of state units
    #[arg(long, env = "SIZE")]
    pub size: Option<usize>,

    /// Fraction of non-zero weights
    #[arg(long, env = "DENSITY")]
    pub density: Option<f64>,

    /// Target spectral radius
    #[arg(long, env = "RADIUS")]
    pub radius: Option<f64>,

    #[arg(long, env = "BIAS", value_parser = BoolishValueParser::new())]
    pub bias: Option<bool>,

    /// tanh, sigmoid or none
    #[arg(long, env = "ACTIVATION")]
    pub activation: Option<Activation>,

    /// Streaming normalization rate, disabled when absent
    #[arg(long, env = "NORM_RATE")]
    pub norm_rate: Option<f64>,

    /// Snapshot file, loaded at startup and written on save
    #[arg(long, env = "MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Write a snapshot every N steps
    #[arg(long, env = "SAVE_EVERY")]
    pub save_every: Option<u64>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn reservoir_config(&self) -> res_context::Result<ReservoirConfig> {
        let mut config = match &self.config {
            Some(path) => ReservoirConfig::from_file(path)?,
            None => ReservoirConfig::default(),
        };
        if let Some(size) = self.size {
            config = config.with_size(size);
        }
        if let Some(density) = self.density {
            config = config.with_density(density);
        }
        if let Some(radius) = self.radius {
            config = config.with_spectral_radius(radius);
        }
        if let Some(bias) = self.bias {
            config = config.with_bias(bias);
        }
        if let Some(activation) = self.activation {
            config = config.with_activation(activation);
        }
        if self.norm_rate.is_some() {
            config = config.with_norm_rate(self.norm_rate);
        }
        if let Some(path) = &self.model_path {
            config = config.with_model_path(path);
        }
        if self.save_every.is_some() {
            config = config.with_save_every(self.save_every);
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::Args;
    use clap::Parser;
    use res::Activation;

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("reservoir.json");
        std::fs::write(&file, r#"{"size": 64, "density": 0.5}"#).unwrap();

        let args = Args::try_parse_from([
            "res_server",
            "--config",
            file.to_str().unwrap(),
            "--size",
            "32",
            "--activation",
            "Sigmoid",
            "--bias",
            "no",
        ])
        .unwrap();
        let config = args.reservoir_config().unwrap();
        assert_eq!(config.size, 32);
        assert_eq!(config.density, 0.5);
        assert_eq!(config.activation, Activation::Sigmoid);
        assert!(!config.bias);
    }

    #[test]
    fn unknown_activation_is_a_parse_error() {
        assert!(Args::try_parse_from(["res_server", "--activation", "relu"]).is_err());
    }

    #[test]
    fn invalid_values_fail_validation() {
        let args = Args::try_parse_from(["res_server", "--density", "1.5"]).unwrap();
        assert!(args.reservoir_config().is_err());
    }
}
