//! Classification metrics

use serde::{Deserialize, Serialize};

use crate::model::SquatNet;
use crate::types::{Label, LabeledSample};

/// Probabilities are clipped to this distance from 0 and 1 before taking logs
const PROBABILITY_EPSILON: f64 = 1e-7;

/// Binary cross-entropy of one prediction
pub fn binary_cross_entropy(probability: f64, target: f64) -> f64 {
    let p = probability.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
    -(target * p.ln() + (1.0 - target) * (1.0 - p).ln())
}

/// Counts of predicted vs actual classes, with squat as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn record(&mut self, actual: Label, predicted: Label) {
        match (actual, predicted) {
            (Label::Squat, Label::Squat) => self.true_positives += 1,
            (Label::NonSquat, Label::NonSquat) => self.true_negatives += 1,
            (Label::NonSquat, Label::Squat) => self.false_positives += 1,
            (Label::Squat, Label::NonSquat) => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Loss and confusion matrix of a network over a set of samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f64,
    pub matrix: ConfusionMatrix,
}

impl Evaluation {
    pub fn accuracy(&self) -> f64 {
        self.matrix.accuracy()
    }
}

/// Evaluate `network` in inference mode. `None` for an empty sample set.
pub fn evaluate(network: &SquatNet, samples: &[LabeledSample]) -> Option<Evaluation> {
    if samples.is_empty() {
        return None;
    }

    let mut loss = 0.0;
    let mut matrix = ConfusionMatrix::default();
    for sample in samples {
        let probability = network.predict(&sample.features);
        loss += binary_cross_entropy(probability, sample.label.as_target());
        matrix.record(sample.label, predicted_label(probability));
    }

    Some(Evaluation {
        loss: loss / samples.len() as f64,
        matrix,
    })
}

/// Class implied by a squat probability under the strict `> 0.5` rule
pub fn predicted_label(probability: f64) -> Label {
    if probability > 0.5 {
        Label::Squat
    } else {
        Label::NonSquat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix() {
        let mut matrix = ConfusionMatrix::default();
        matrix.record(Label::Squat, Label::Squat);
        matrix.record(Label::Squat, Label::Squat);
        matrix.record(Label::Squat, Label::NonSquat);
        matrix.record(Label::NonSquat, Label::NonSquat);
        matrix.record(Label::NonSquat, Label::Squat);

        assert_eq!(matrix.total(), 5);
        assert!((matrix.accuracy() - 0.6).abs() < 1e-12);
        assert!((matrix.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((matrix.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((matrix.f1() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = ConfusionMatrix::default();
        assert_eq!(matrix.accuracy(), 0.0);
        assert_eq!(matrix.f1(), 0.0);
    }

    #[test]
    fn test_binary_cross_entropy() {
        assert!((binary_cross_entropy(0.5, 1.0) - std::f64::consts::LN_2).abs() < 1e-12);
        assert!(binary_cross_entropy(0.99, 1.0) < binary_cross_entropy(0.6, 1.0));
        assert!(binary_cross_entropy(1.0, 0.0).is_finite());
    }

    #[test]
    fn test_predicted_label_threshold() {
        assert_eq!(predicted_label(0.5), Label::NonSquat);
        assert_eq!(predicted_label(0.5000001), Label::Squat);
    }
}
