pub mod error;
pub mod esn;

pub use error::{EsnError, Result};
pub use esn::{
    Esn, EsnParameters, activation::Activation, normalizer::RunningNormalizer, weights::Weights,
};
