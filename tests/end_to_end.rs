//! End-to-end tests: synthetic sample files on disk → training → artifact →
//! inference.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use squat_detector::metrics::evaluate;
use squat_detector::model::SquatNet;
use squat_detector::types::LabeledSample;
use squat_detector::{
    train_from_directory, Classifier, ComputeError, DatasetLoader, FeatureExtractor, Label,
    MotionSample, TrainingConfig, Verdict,
};

/// Squats dip the phone by tens of degrees and come back; other motion stays
/// roughly level.
fn synthetic_sample(label: Label, rng: &mut StdRng) -> serde_json::Value {
    let base: f64 = rng.gen_range(-10.0..10.0);
    let amplitude: f64 = rng.gen_range(30.0..45.0);
    let readings: Vec<serde_json::Value> = (0..22)
        .map(|i| {
            let phase = PI * i as f64 / 19.0;
            let (beta, accel) = match label {
                Label::Squat => (
                    base + amplitude * phase.sin() + rng.gen_range(-0.5..0.5),
                    -1.5 * (2.0 * phase).cos() + rng.gen_range(-0.1..0.1),
                ),
                Label::NonSquat => (
                    base + rng.gen_range(-1.0..1.0),
                    rng.gen_range(-0.2..0.2),
                ),
            };
            json!({ "t": i * 100, "beta": beta, "verticalAccel": accel })
        })
        .collect();

    json!({ "label": label.as_str(), "duration_ms": 2000, "data": readings })
}

fn write_category(root: &Path, label: Label, count: usize, rng: &mut StdRng) {
    let folder = root.join(label.as_str());
    fs::create_dir_all(&folder).unwrap();
    for i in 0..count {
        let sample = synthetic_sample(label, rng);
        fs::write(
            folder.join(format!("{}_{}.json", label.as_str(), i)),
            serde_json::to_string_pretty(&sample).unwrap(),
        )
        .unwrap();
    }
}

fn write_dataset(root: &Path, per_class: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    write_category(root, Label::NonSquat, per_class, &mut rng);
    write_category(root, Label::Squat, per_class, &mut rng);
}

#[test]
fn trained_model_beats_chance_on_held_out_samples() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("training_data");
    write_dataset(&data, 10, 1);
    let model_path = dir.path().join("squat_detector_model.json");
    let config = TrainingConfig::default();

    let outcome = train_from_directory(&data, &model_path, config.clone()).unwrap();
    assert_eq!(outcome.history.epochs.len(), 100);
    assert_eq!(outcome.artifact.summary.train_samples, 16);
    assert_eq!(outcome.artifact.summary.validation_samples, 4);

    let mut rng = StdRng::seed_from_u64(999);
    let mut held_out = Vec::new();
    for label in Label::ALL {
        for _ in 0..10 {
            let sample: MotionSample =
                serde_json::from_value(synthetic_sample(label, &mut rng)).unwrap();
            held_out.push((label, sample));
        }
    }

    let classifier = Classifier::load(&model_path).unwrap();
    let correct = held_out
        .iter()
        .filter(|(label, sample)| classifier.classify(sample).unwrap().verdict.label() == *label)
        .count();
    let accuracy = correct as f64 / held_out.len() as f64;
    assert!(accuracy > 0.6, "held-out accuracy {}", accuracy);

    // Same seed, same initial weights as the trained network.
    let labeled: Vec<LabeledSample> = held_out
        .iter()
        .map(|(label, sample)| LabeledSample {
            features: FeatureExtractor::extract(sample).unwrap(),
            label: *label,
            source: None,
        })
        .collect();
    let untrained = SquatNet::new(&mut StdRng::seed_from_u64(config.init_seed));
    let untrained_accuracy = evaluate(&untrained, &labeled).unwrap().accuracy();
    assert!(
        accuracy > untrained_accuracy,
        "trained {} vs untrained {}",
        accuracy,
        untrained_accuracy
    );
}

#[test]
fn inference_is_bit_identical_across_loads() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), 4, 2);
    let model_path = dir.path().join("model.json");
    train_from_directory(
        dir.path(),
        &model_path,
        TrainingConfig::default().with_epochs(5),
    )
    .unwrap();

    let sample_path = dir.path().join("squat").join("squat_0.json");
    let first = Classifier::load(&model_path)
        .unwrap()
        .classify_file(&sample_path)
        .unwrap();
    let second = Classifier::load(&model_path)
        .unwrap()
        .classify_file(&sample_path)
        .unwrap();

    assert_eq!(first.probability.to_bits(), second.probability.to_bits());
    assert_eq!(first.verdict, second.verdict);
}

#[test]
fn saved_model_predicts_like_in_memory_model() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), 4, 3);
    let model_path = dir.path().join("model.json");
    let outcome = train_from_directory(
        dir.path(),
        &model_path,
        TrainingConfig::default().with_epochs(3),
    )
    .unwrap();

    let loaded = Classifier::load(&model_path).unwrap();
    let dataset = DatasetLoader::load(dir.path()).unwrap();
    for sample in dataset.iter() {
        let in_memory = outcome.artifact.network.predict(&sample.features);
        let reloaded = loaded.classify_features(&sample.features).probability;
        assert!((in_memory - reloaded).abs() < 1e-12);
    }
}

#[test]
fn training_and_inference_share_features() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), 3, 4);

    let dataset = DatasetLoader::load(dir.path()).unwrap();
    assert_eq!(dataset.len(), 6);
    for sample in dataset.iter() {
        let source = sample.source.as_ref().unwrap();
        let reextracted = FeatureExtractor::extract(&MotionSample::from_file(source).unwrap()).unwrap();
        assert_eq!(reextracted, sample.features);
    }
}

#[test]
fn short_sample_is_skipped_in_training_and_rejected_in_inference() {
    let dir = TempDir::new().unwrap();
    write_dataset(dir.path(), 3, 5);
    let before = DatasetLoader::load(dir.path()).unwrap().len();

    let short = json!({
        "data": (0..10).map(|i| json!({ "beta": i as f64, "verticalAccel": 0.0 })).collect::<Vec<_>>()
    });
    let short_path = dir.path().join("squat").join("short.json");
    fs::write(&short_path, short.to_string()).unwrap();

    let after = DatasetLoader::load(dir.path()).unwrap();
    assert_eq!(after.len(), before);
    assert_eq!(after.count(Label::Squat), 3);

    let model_path = dir.path().join("model.json");
    train_from_directory(
        dir.path(),
        &model_path,
        TrainingConfig::default().with_epochs(1),
    )
    .unwrap();
    let result = Classifier::load(&model_path)
        .unwrap()
        .classify_file(&short_path);
    assert!(matches!(
        result,
        Err(ComputeError::InsufficientReadings { found: 10, required: 20 })
    ));
}

#[test]
fn half_probability_is_not_a_squat() {
    assert_eq!(Verdict::from_probability(0.5), Verdict::NotASquat);
}

#[test]
fn overflowing_samples_do_not_leave_an_unloadable_model() {
    let dir = TempDir::new().unwrap();
    for label in Label::ALL {
        let folder = dir.path().join(label.as_str());
        fs::create_dir_all(&folder).unwrap();
        for i in 0..4 {
            let readings: Vec<serde_json::Value> = (0..20)
                .map(|t| {
                    let beta = if t % 2 == 0 { 1e308 } else { -1e308 };
                    json!({ "beta": beta, "verticalAccel": 1e308 })
                })
                .collect();
            fs::write(
                folder.join(format!("{}.json", i)),
                json!({ "data": readings }).to_string(),
            )
            .unwrap();
        }
    }

    let model_path = dir.path().join("model.json");
    let result = train_from_directory(
        dir.path(),
        &model_path,
        TrainingConfig::default().with_epochs(2),
    );

    assert!(matches!(result, Err(ComputeError::ModelFormat(_))));
    assert!(!model_path.exists());
}
