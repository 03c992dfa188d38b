use crate::nd_json::NdJsonError;
use loaders::SnapshotError;
use res::EsnError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Esn(#[from] EsnError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Array(#[from] NdJsonError),

    #[error("Key `{key}` mapped to {actual} indices, expected {expected}")]
    MappingMismatch {
        key: String,
        expected: usize,
        actual: usize,
    },

    #[error("Key `{key}` mapped to index {index} outside a state of size {size}")]
    IndexOutOfRange {
        key: String,
        index: usize,
        size: usize,
    },

    #[error("Shape {shape:?} addresses {count} values, more than the limit of {limit}")]
    ShapeTooLarge {
        shape: Vec<usize>,
        count: usize,
        limit: usize,
    },

    #[error("No model path configured")]
    NoModelPath,
}

pub type Result<T> = std::result::Result<T, ContextError>;
