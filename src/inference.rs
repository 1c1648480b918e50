//! Inference
//!
//! Loads a persisted model once and classifies individual motion samples.
//! Samples go through the same feature extractor as training, including its
//! minimum-length check.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::artifact::ModelArtifact;
use crate::error::ComputeError;
use crate::features::FeatureExtractor;
use crate::metrics::predicted_label;
use crate::types::{FeatureTensor, Label, MotionSample};

/// Probabilities strictly above this value are squats
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Squat,
    NotASquat,
}

impl Verdict {
    pub fn from_probability(probability: f64) -> Self {
        match predicted_label(probability) {
            Label::Squat => Verdict::Squat,
            Label::NonSquat => Verdict::NotASquat,
        }
    }

    pub fn label(&self) -> Label {
        match self {
            Verdict::Squat => Label::Squat,
            Verdict::NotASquat => Label::NonSquat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Squat => "SQUAT",
            Verdict::NotASquat => "NOT A SQUAT",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model output for one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Squat probability in [0, 1]
    pub probability: f64,
    pub verdict: Verdict,
}

impl Classification {
    pub fn from_probability(probability: f64) -> Self {
        Self {
            probability,
            verdict: Verdict::from_probability(probability),
        }
    }

    /// Probability as a percentage
    pub fn confidence_percent(&self) -> f64 {
        self.probability * 100.0
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Result: {} ({:.1}% confidence)",
            self.verdict,
            self.confidence_percent()
        )
    }
}

/// A loaded model ready to classify samples
pub struct Classifier {
    artifact: ModelArtifact,
}

impl Classifier {
    /// Wrap an already loaded artifact
    pub fn new(artifact: ModelArtifact) -> Self {
        Self { artifact }
    }

    /// Load the model artifact at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ComputeError> {
        Ok(Self::new(ModelArtifact::load(path)?))
    }

    /// The artifact backing this classifier
    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Classify an already extracted feature tensor
    pub fn classify_features(&self, features: &FeatureTensor) -> Classification {
        Classification::from_probability(self.artifact.network.predict(features))
    }

    /// Classify one sample. Fails if it has fewer readings than the window.
    pub fn classify(&self, sample: &MotionSample) -> Result<Classification, ComputeError> {
        let features = FeatureExtractor::extract(sample)?;
        Ok(self.classify_features(&features))
    }

    /// Read a sample file and classify it
    pub fn classify_file(&self, path: impl AsRef<Path>) -> Result<Classification, ComputeError> {
        let sample = MotionSample::from_file(path)?;
        self.classify(&sample)
    }
}
