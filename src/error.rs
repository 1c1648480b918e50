//! Error types for the squat detector

use thiserror::Error;

/// Errors that can occur while loading samples, training or classifying
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Sample has {found} readings, at least {required} are required")]
    InsufficientReadings { found: usize, required: usize },

    #[error("Dataset is empty: no usable samples were found")]
    EmptyDataset,

    #[error("Not enough samples to train: {0}")]
    InsufficientSamples(String),

    #[error("Invalid model artifact: {0}")]
    ModelFormat(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Invalid training configuration: {0}")]
    InvalidConfig(String),
}
