//! Feature extraction
//!
//! This module turns a raw motion sample into the fixed 20x3 tensor the
//! classifier consumes. Training and inference both go through
//! [`FeatureExtractor::extract`], so the two paths cannot drift apart.
//!
//! Channels, one row per time step:
//! - tilt angle minus the first reading (zero-centered shape signal)
//! - raw vertical acceleration
//! - first difference of the centered tilt, with an implicit zero predecessor

use ndarray::Array2;

use crate::error::ComputeError;
use crate::types::{
    FeatureTensor, MotionSample, ACCEL_CHANNEL, BETA_CHANNEL, CHANNELS, VELOCITY_CHANNEL,
    WINDOW_LEN,
};

/// Feature extractor shared by the training and inference paths
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Derive the feature tensor from the first `WINDOW_LEN` readings.
    ///
    /// Fails with [`ComputeError::InsufficientReadings`] when the sample is
    /// shorter than the window.
    pub fn extract(sample: &MotionSample) -> Result<FeatureTensor, ComputeError> {
        if sample.data.len() < WINDOW_LEN {
            return Err(ComputeError::InsufficientReadings {
                found: sample.data.len(),
                required: WINDOW_LEN,
            });
        }

        let window = &sample.data[..WINDOW_LEN];
        let origin = window[0].beta;

        let mut values = Array2::<f64>::zeros((WINDOW_LEN, CHANNELS));
        let mut previous = 0.0;
        for (step, reading) in window.iter().enumerate() {
            let centered = reading.beta - origin;
            values[[step, BETA_CHANNEL]] = centered;
            values[[step, ACCEL_CHANNEL]] = reading.vertical_accel;
            values[[step, VELOCITY_CHANNEL]] = centered - previous;
            previous = centered;
        }

        FeatureTensor::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MotionReading;
    use pretty_assertions::assert_eq;

    fn make_sample(len: usize) -> MotionSample {
        let readings = (0..len)
            .map(|i| {
                let x = i as f64;
                MotionReading::new(30.0 + 2.5 * x - 0.1 * x * x, (x * 0.7).sin())
            })
            .collect();
        MotionSample::from_readings(readings)
    }

    #[test]
    fn test_shape() {
        let tensor = FeatureExtractor::extract(&make_sample(25)).unwrap();
        assert_eq!(tensor.values().dim(), (WINDOW_LEN, CHANNELS));
    }

    #[test]
    fn test_first_centered_value_is_zero() {
        let tensor = FeatureExtractor::extract(&make_sample(20)).unwrap();
        assert_eq!(tensor.channel(BETA_CHANNEL)[0], 0.0);
    }

    #[test]
    fn test_velocity_prepends_zero() {
        let tensor = FeatureExtractor::extract(&make_sample(20)).unwrap();
        let beta = tensor.channel(BETA_CHANNEL);
        let velocity = tensor.channel(VELOCITY_CHANNEL);

        assert_eq!(velocity.len(), WINDOW_LEN);
        assert_eq!(velocity[0], beta[0]);
        for i in 1..WINDOW_LEN {
            assert_eq!(velocity[i], beta[i] - beta[i - 1]);
        }
    }

    #[test]
    fn test_known_values() {
        let readings = (0..WINDOW_LEN)
            .map(|i| MotionReading::new(10.0 + i as f64 * 3.0, -(i as f64)))
            .collect();
        let tensor = FeatureExtractor::extract(&MotionSample::from_readings(readings)).unwrap();

        assert_eq!(tensor.values()[[0, BETA_CHANNEL]], 0.0);
        assert_eq!(tensor.values()[[4, BETA_CHANNEL]], 12.0);
        assert_eq!(tensor.values()[[4, ACCEL_CHANNEL]], -4.0);
        assert_eq!(tensor.values()[[4, VELOCITY_CHANNEL]], 3.0);
        assert_eq!(tensor.values()[[0, VELOCITY_CHANNEL]], 0.0);
    }

    #[test]
    fn test_only_leading_window_is_used() {
        let short = make_sample(20);
        let mut long = short.clone();
        long.data.push(MotionReading::new(999.0, 999.0));

        assert_eq!(
            FeatureExtractor::extract(&short).unwrap(),
            FeatureExtractor::extract(&long).unwrap()
        );
    }

    #[test]
    fn test_deterministic() {
        let sample = make_sample(30);
        let first = FeatureExtractor::extract(&sample).unwrap();
        let second = FeatureExtractor::extract(&sample).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_short_sample_rejected() {
        let result = FeatureExtractor::extract(&make_sample(19));
        assert!(matches!(
            result,
            Err(ComputeError::InsufficientReadings {
                found: 19,
                required: 20
            })
        ));
    }
}
