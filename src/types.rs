//! Core types for the squat detector
//!
//! This module defines the data structures that flow through training and
//! inference: raw motion samples as recorded on the phone, the fixed-shape
//! feature tensor derived from them, and the labeled dataset.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ComputeError;

/// Number of leading readings consumed from every sample
pub const WINDOW_LEN: usize = 20;

/// Number of feature channels per time step
pub const CHANNELS: usize = 3;

/// Channel index of the zero-centered tilt angle
pub const BETA_CHANNEL: usize = 0;

/// Channel index of the raw vertical acceleration
pub const ACCEL_CHANNEL: usize = 1;

/// Channel index of the first difference of the centered tilt angle
pub const VELOCITY_CHANNEL: usize = 2;

/// A single time-ordered sensor reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionReading {
    /// Milliseconds since the recording window opened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<f64>,
    /// Tilt angle (degrees)
    pub beta: f64,
    /// Vertical acceleration
    #[serde(rename = "verticalAccel")]
    pub vertical_accel: f64,
}

impl MotionReading {
    pub fn new(beta: f64, vertical_accel: f64) -> Self {
        Self {
            t: None,
            beta,
            vertical_accel,
        }
    }
}

/// One recorded motion event as written by the phone-side collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Label the collector attached at recording time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Length of the recording window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Ordered readings
    pub data: Vec<MotionReading>,
}

impl MotionSample {
    /// Build an unlabeled sample from readings
    pub fn from_readings(data: Vec<MotionReading>) -> Self {
        Self {
            label: None,
            duration_ms: None,
            data,
        }
    }

    /// Parse a sample document
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a sample file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ComputeError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Binary motion class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    NonSquat,
    Squat,
}

impl Label {
    /// Categories in the order the dataset loader scans them
    pub const ALL: [Label; 2] = [Label::NonSquat, Label::Squat];

    /// Category folder name
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::NonSquat => "non_squat",
            Label::Squat => "squat",
        }
    }

    /// Numeric class id (0 = non-squat, 1 = squat)
    pub fn as_index(&self) -> u8 {
        match self {
            Label::NonSquat => 0,
            Label::Squat => 1,
        }
    }

    /// Regression target for the sigmoid output
    pub fn as_target(&self) -> f64 {
        f64::from(self.as_index())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "non_squat" => Some(Label::NonSquat),
            "squat" => Some(Label::Squat),
            _ => None,
        }
    }
}

/// Fixed-shape (WINDOW_LEN x CHANNELS) model input derived from a sample
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor(Array2<f64>);

impl FeatureTensor {
    /// Wrap an array, checking it has the expected shape
    pub fn new(values: Array2<f64>) -> Result<Self, ComputeError> {
        if values.dim() != (WINDOW_LEN, CHANNELS) {
            return Err(ComputeError::ShapeMismatch(format!(
                "expected feature tensor {}x{}, got {}x{}",
                WINDOW_LEN,
                CHANNELS,
                values.nrows(),
                values.ncols()
            )));
        }
        Ok(Self(values))
    }

    /// The `[time, channel]` values
    pub fn values(&self) -> &Array2<f64> {
        &self.0
    }

    /// One channel across all time steps
    pub fn channel(&self, index: usize) -> ArrayView1<'_, f64> {
        self.0.index_axis(Axis(1), index)
    }
}

/// A feature tensor paired with its class
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub features: FeatureTensor,
    pub label: Label,
    /// File the sample was read from, when loaded from disk
    pub source: Option<PathBuf>,
}

/// Supervised dataset. Row order follows the loader's traversal and carries
/// no meaning.
#[derive(Debug, Clone, Default)]
pub struct LabeledDataset {
    samples: Vec<LabeledSample>,
    skipped: usize,
}

impl LabeledDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one extracted sample
    pub fn push(&mut self, sample: LabeledSample) {
        self.samples.push(sample);
    }

    /// Count a sample file that was read but left out
    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Number of sample files left out for being shorter than the window
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of samples carrying `label`
    pub fn count(&self, label: Label) -> usize {
        self.samples.iter().filter(|s| s.label == label).count()
    }

    /// Samples in load order
    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LabeledSample> {
        self.samples.iter()
    }
}

impl FromIterator<LabeledSample> for LabeledDataset {
    fn from_iter<I: IntoIterator<Item = LabeledSample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
            skipped: 0,
        }
    }
}
