use crate::error::EsnError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

// Nonlinearity applied to the reservoir after the linear transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[serde(rename = "none", alias = "identity")]
    Identity,
    #[default]
    Tanh,
    Sigmoid,
}

fn sigmoid(x: f64) -> f64 {
    1. / (1. + (-x).exp())
}

impl Activation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "none",
            Self::Tanh => "tanh",
            Self::Sigmoid => "sigmoid",
        }
    }

    /// Elementwise function, `None` for the identity so callers can skip the pass.
    pub fn function(&self) -> Option<fn(f64) -> f64> {
        match self {
            Self::Identity => None,
            Self::Tanh => Some(f64::tanh),
            Self::Sigmoid => Some(sigmoid),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = EsnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "identity" => Ok(Self::Identity),
            "tanh" => Ok(Self::Tanh),
            "sigmoid" => Ok(Self::Sigmoid),
            other => Err(EsnError::Config(format!("unknown activation `{other}`"))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Activation;
    use crate::EsnError;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("TANH".parse::<Activation>(), Ok(Activation::Tanh));
        assert_eq!("Sigmoid".parse::<Activation>(), Ok(Activation::Sigmoid));
        assert_eq!("none".parse::<Activation>(), Ok(Activation::Identity));
        assert_eq!("identity".parse::<Activation>(), Ok(Activation::Identity));
    }

    #[test]
    fn unknown_name_is_config_error() {
        let err = "relu".parse::<Activation>().unwrap_err();
        assert!(matches!(err, EsnError::Config(_)));
    }

    #[test]
    fn display_round_trips() {
        for activation in [Activation::Identity, Activation::Tanh, Activation::Sigmoid] {
            assert_eq!(activation.to_string().parse::<Activation>(), Ok(activation));
        }
    }

    #[test]
    fn sigmoid_is_centered() {
        let f = Activation::Sigmoid.function().unwrap();
        assert_eq!(f(0.), 0.5);
        assert!(Activation::Identity.function().is_none());
    }
}
