//! Persisted model artifact
//!
//! A trained model is stored as one JSON document holding the network
//! weights together with the configuration and summary of the run that
//! produced it. Saving always overwrites the target file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::config::TrainingConfig;
use crate::error::ComputeError;
use crate::model::SquatNet;
use crate::trainer::TrainingSummary;
use crate::{PRODUCER_NAME, VERSION};

/// Artifact layout version
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Default artifact file name
pub const DEFAULT_MODEL_PATH: &str = "squat_detector_model.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model_id: Uuid,
    pub producer: String,
    pub producer_version: String,
    pub trained_at: DateTime<Utc>,
    pub config: TrainingConfig,
    pub summary: TrainingSummary,
    pub network: SquatNet,
}

impl ModelArtifact {
    pub fn new(network: SquatNet, config: TrainingConfig, summary: TrainingSummary) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_id: Uuid::new_v4(),
            producer: PRODUCER_NAME.to_string(),
            producer_version: VERSION.to_string(),
            trained_at: Utc::now(),
            config,
            summary,
            network,
        }
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an artifact and check its layer shapes.
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let artifact: Self = serde_json::from_str(json)?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ComputeError::ModelFormat(format!(
                "unsupported format version {} (expected {})",
                artifact.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        artifact.network.validate_shapes()?;
        Ok(artifact)
    }

    /// Reject weights or metrics that JSON cannot carry.
    pub fn validate_finite(&self) -> Result<(), ComputeError> {
        self.network.validate_finite()?;
        let summary = &self.summary;
        let metrics = [
            Some(summary.final_loss),
            Some(summary.final_accuracy),
            summary.final_val_loss,
            summary.final_val_accuracy,
        ];
        if metrics.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ComputeError::ModelFormat(
                "training summary contains non-finite metrics".into(),
            ));
        }
        Ok(())
    }

    /// Write the artifact to `path`, replacing any existing file. Nothing is
    /// written when the weights or metrics are not finite.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ComputeError> {
        let path = path.as_ref();
        self.validate_finite()?;
        fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), model_id = %self.model_id, "model saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ComputeError> {
        let path = path.as_ref();
        let artifact = Self::from_json(&fs::read_to_string(path)?)?;
        tracing::debug!(path = %path.display(), model_id = %artifact.model_id, "model loaded");
        Ok(artifact)
    }
}
