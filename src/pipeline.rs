//! Pipeline orchestration
//!
//! One-call entry points for the two process paths:
//! - training: dataset directory → [`DatasetLoader`] → [`Trainer`] → artifact file
//! - inference: artifact file + sample file → [`Classifier`] → [`Classification`]
//!
//! plus offline scoring of a labeled directory against a trained model.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::TrainingConfig;
use crate::dataset::DatasetLoader;
use crate::error::ComputeError;
use crate::inference::{Classification, Classifier};
use crate::metrics::{evaluate, ConfusionMatrix};
use crate::trainer::{Trainer, TrainingOutcome};
use crate::types::Label;

/// Default training data root, containing `non_squat/` and `squat/`
pub const DEFAULT_TRAINING_DIR: &str = "training_data";

/// Default sample classified by the evaluation run
pub const DEFAULT_SAMPLE_PATH: &str = "testing_data/squat_1768713050231.json";

/// Load `data_dir`, train with `config`, and write the artifact to
/// `model_path`, replacing any existing file.
pub fn train_from_directory(
    data_dir: impl AsRef<Path>,
    model_path: impl AsRef<Path>,
    config: TrainingConfig,
) -> Result<TrainingOutcome, ComputeError> {
    let trainer = Trainer::new(config)?;
    let dataset = DatasetLoader::load(data_dir)?;
    tracing::info!(total = dataset.len(), "samples loaded");

    let outcome = trainer.fit(&dataset)?;
    outcome.artifact.save(model_path)?;
    Ok(outcome)
}

/// Load the model at `model_path` and classify the sample at `sample_path`.
pub fn classify_file(
    model_path: impl AsRef<Path>,
    sample_path: impl AsRef<Path>,
) -> Result<Classification, ComputeError> {
    Classifier::load(model_path)?.classify_file(sample_path)
}

/// Accuracy of a trained model over a labeled directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub samples: usize,
    /// Files left out for having fewer readings than the feature window
    pub skipped: usize,
    pub squat_samples: usize,
    pub non_squat_samples: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionMatrix,
}

/// Classify every sample under `data_dir` with the model at `model_path`.
/// Samples too short to classify are counted in [`ScoreReport::skipped`].
pub fn score_directory(
    model_path: impl AsRef<Path>,
    data_dir: impl AsRef<Path>,
) -> Result<ScoreReport, ComputeError> {
    let classifier = Classifier::load(model_path)?;
    let dataset = DatasetLoader::load(data_dir)?;
    let evaluation =
        evaluate(&classifier.artifact().network, dataset.samples()).ok_or(ComputeError::EmptyDataset)?;
    let matrix = evaluation.matrix;

    Ok(ScoreReport {
        samples: dataset.len(),
        skipped: dataset.skipped(),
        squat_samples: dataset.count(Label::Squat),
        non_squat_samples: dataset.count(Label::NonSquat),
        loss: evaluation.loss,
        accuracy: matrix.accuracy(),
        precision: matrix.precision(),
        recall: matrix.recall(),
        f1: matrix.f1(),
        confusion: matrix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_sample(path: &Path, slope: f64) {
        let readings: Vec<String> = (0..20)
            .map(|i| format!(r#"{{"beta": {}, "verticalAccel": 0.0}}"#, slope * i as f64))
            .collect();
        fs::write(path, format!(r#"{{"data": [{}]}}"#, readings.join(","))).unwrap();
    }

    fn write_tree(root: &Path) {
        for (category, slope) in [("squat", 3.0), ("non_squat", 0.0)] {
            let folder = root.join(category);
            fs::create_dir_all(&folder).unwrap();
            for i in 0..4 {
                write_sample(&folder.join(format!("{}.json", i)), slope + i as f64 * 0.1);
            }
        }
    }

    #[test]
    fn test_train_writes_artifact() {
        let dir = TempDir::new().unwrap();
        write_tree(dir.path());
        let model_path = dir.path().join("model.json");

        let outcome = train_from_directory(
            dir.path(),
            &model_path,
            TrainingConfig::default().with_epochs(2),
        )
        .unwrap();

        assert!(model_path.exists());
        assert_eq!(outcome.history.epochs.len(), 2);
        let classification = classify_file(&model_path, dir.path().join("squat").join("0.json")).unwrap();
        assert!(classification.probability >= 0.0 && classification.probability <= 1.0);
    }

    #[test]
    fn test_train_on_empty_directory_fails() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.json");
        let result = train_from_directory(dir.path(), &model_path, TrainingConfig::default());

        assert!(matches!(result, Err(ComputeError::EmptyDataset)));
        assert!(!model_path.exists());
    }

    #[test]
    fn test_score_directory() {
        let dir = TempDir::new().unwrap();
        write_tree(dir.path());
        let model_path = dir.path().join("model.json");
        train_from_directory(
            dir.path(),
            &model_path,
            TrainingConfig::default().with_epochs(2),
        )
        .unwrap();

        let report = score_directory(&model_path, dir.path()).unwrap();
        assert_eq!(report.samples, 8);
        assert_eq!(report.squat_samples, 4);
        assert_eq!(report.confusion.total(), 8);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn test_score_reports_short_samples() {
        let dir = TempDir::new().unwrap();
        write_tree(dir.path());
        let model_path = dir.path().join("model.json");
        train_from_directory(
            dir.path(),
            &model_path,
            TrainingConfig::default().with_epochs(1),
        )
        .unwrap();

        fs::write(
            dir.path().join("squat").join("short.json"),
            r#"{"data": [{"beta": 1.0, "verticalAccel": 0.0}]}"#,
        )
        .unwrap();
        let report = score_directory(&model_path, dir.path()).unwrap();

        assert_eq!(report.samples, 8);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_classify_with_missing_model() {
        let dir = TempDir::new().unwrap();
        write_tree(dir.path());
        let result = classify_file(dir.path().join("absent.json"), dir.path().join("squat").join("0.json"));
        assert!(matches!(result, Err(ComputeError::Io(_))));
    }
}
