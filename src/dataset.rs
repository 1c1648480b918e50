//! Dataset loading and splitting
//!
//! Walks a `{non_squat,squat}/*.json` tree, runs every sample through the
//! feature extractor and attaches the folder's label. Samples shorter than
//! the feature window are dropped; a missing category folder is skipped.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ComputeError;
use crate::features::FeatureExtractor;
use crate::types::{Label, LabeledDataset, LabeledSample, MotionSample};

/// File extension of recorded samples
pub const SAMPLE_EXTENSION: &str = "json";

/// Loader for labeled sample directories
pub struct DatasetLoader;

impl DatasetLoader {
    /// Load every category folder under `root`.
    pub fn load(root: impl AsRef<Path>) -> Result<LabeledDataset, ComputeError> {
        let root = root.as_ref();
        let mut dataset = LabeledDataset::new();

        for label in Label::ALL {
            let folder = root.join(label.as_str());
            if !folder.is_dir() {
                tracing::debug!(folder = %folder.display(), "category folder missing, skipping");
                continue;
            }

            tracing::info!(category = label.as_str(), "loading category files");
            let before = dataset.len();
            for path in sample_files(&folder)? {
                let sample = MotionSample::from_file(&path)?;
                match Self::label_sample(&sample, label, &path)? {
                    Some(labeled) => dataset.push(labeled),
                    None => dataset.record_skipped(),
                }
            }
            tracing::debug!(
                category = label.as_str(),
                loaded = dataset.len() - before,
                "category loaded"
            );
        }

        if dataset.skipped() > 0 {
            tracing::info!(skipped = dataset.skipped(), "short samples left out");
        }

        if !dataset.is_empty() && Label::ALL.iter().any(|l| dataset.count(*l) == 0) {
            tracing::warn!(
                total = dataset.len(),
                squat = dataset.count(Label::Squat),
                non_squat = dataset.count(Label::NonSquat),
                "dataset contains a single class"
            );
        }

        Ok(dataset)
    }

    /// Extract features for one sample, returning `None` when it is too short.
    fn label_sample(
        sample: &MotionSample,
        label: Label,
        path: &Path,
    ) -> Result<Option<LabeledSample>, ComputeError> {
        if let Some(embedded) = sample.label.as_deref() {
            if Label::from_name(embedded) != Some(label) {
                tracing::debug!(
                    file = %path.display(),
                    embedded,
                    folder = label.as_str(),
                    "embedded label disagrees with folder, using folder"
                );
            }
        }

        match FeatureExtractor::extract(sample) {
            Ok(features) => Ok(Some(LabeledSample {
                features,
                label,
                source: Some(path.to_path_buf()),
            })),
            Err(ComputeError::InsufficientReadings { found, required }) => {
                tracing::debug!(file = %path.display(), found, required, "sample too short, skipping");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Sample files in `folder`, sorted by name so loads are reproducible
fn sample_files(folder: &Path) -> Result<Vec<PathBuf>, ComputeError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        let is_sample = path
            .extension()
            .map(|ext| ext == SAMPLE_EXTENSION)
            .unwrap_or(false);
        if is_sample && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Training and validation partitions of a dataset
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Vec<LabeledSample>,
    pub validation: Vec<LabeledSample>,
}

/// Shuffle with a fixed seed and hold out `ceil(n * validation_fraction)`
/// samples for validation.
pub fn train_validation_split(
    dataset: &LabeledDataset,
    validation_fraction: f64,
    seed: u64,
) -> Result<DatasetSplit, ComputeError> {
    if dataset.is_empty() {
        return Err(ComputeError::EmptyDataset);
    }

    let n = dataset.len();
    let n_validation = ((n as f64) * validation_fraction).ceil() as usize;
    let n_validation = n_validation.min(n);
    if n_validation == n {
        return Err(ComputeError::InsufficientSamples(format!(
            "{} sample(s) leave nothing to train on after a {:.0}% validation split",
            n,
            validation_fraction * 100.0
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let samples = dataset.samples();
    let validation = order[..n_validation]
        .iter()
        .map(|&i| samples[i].clone())
        .collect();
    let train = order[n_validation..]
        .iter()
        .map(|&i| samples[i].clone())
        .collect();

    Ok(DatasetSplit { train, validation })
}
