use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EsnError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Degenerate weight matrix: spectral radius vanished in {attempts} draws")]
    DegenerateMatrix { attempts: usize },

    #[error("Invalid weight matrix: {0}")]
    InvalidWeights(String),

    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, EsnError>;
