//! Squat Detector - binary motion classifier for phone tilt/acceleration samples
//!
//! Trains a small 1-D convolutional network to tell squats from other motion
//! and classifies new samples with the persisted model. Both paths share one
//! feature extractor:
//!
//! - **Training**: sample directory → feature extraction → dataset split →
//!   CNN training → model artifact
//! - **Inference**: model artifact + sample → feature extraction → probability
//!   → `SQUAT` / `NOT A SQUAT`

pub mod artifact;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod inference;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod trainer;
pub mod types;

pub use artifact::{ModelArtifact, DEFAULT_MODEL_PATH};
pub use config::TrainingConfig;
pub use dataset::{train_validation_split, DatasetLoader};
pub use error::ComputeError;
pub use features::FeatureExtractor;
pub use inference::{Classification, Classifier, Verdict};
pub use pipeline::{classify_file, score_directory, train_from_directory, ScoreReport};
pub use trainer::{Trainer, TrainingHistory, TrainingOutcome};
pub use types::{FeatureTensor, Label, LabeledDataset, MotionReading, MotionSample};

/// Crate version embedded in every model artifact
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for model artifacts
pub const PRODUCER_NAME: &str = "squat-detector";
