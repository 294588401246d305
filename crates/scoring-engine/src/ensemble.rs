//! Ensemble reduction: unweighted mean of the member predictions, batch
//! min-max normalization, then optional calibration.

use crate::calibrator::IsotonicCalibrator;
use crate::features::FeatureFrame;
use crate::model::Model;
use ara_core::AraError;

/// Guards the zero-range batch in the min-max rescale.
pub const NORM_EPS: f64 = 1e-12;

/// Min-max rescale in place using the batch's own min/max. A zero-range
/// batch (every value identical, including a singleton) degenerates to
/// all zeros. Batch-relative on purpose: the same row scored in different
/// batches can land on different probabilities.
pub fn norm01(values: &mut [f64]) {
    let Some(lo) = values.iter().copied().reduce(f64::min) else {
        return;
    };
    let hi = values.iter().copied().fold(lo, f64::max);
    if hi > lo {
        for v in values.iter_mut() {
            *v = (*v - lo) / (hi - lo + NORM_EPS);
        }
    } else {
        values.iter_mut().for_each(|v| *v = 0.0);
    }
}

/// Score one batch: every model produces a raw probability vector, the
/// vectors are averaged elementwise (all models weigh equally regardless of
/// their declared validation metrics), normalized to the batch range, and
/// passed through the calibrator when one is present.
pub fn predict_mean(
    models: &[Box<dyn Model>],
    calibrator: Option<&IsotonicCalibrator>,
    frame: &FeatureFrame,
) -> Result<Vec<f64>, AraError> {
    if models.is_empty() {
        return Err(AraError::Scoring("ensemble has no models".into()));
    }
    let rows = frame.num_rows();
    let mut sum = vec![0.0f64; rows];
    for model in models {
        let raw = model.predict(frame)?;
        if raw.len() != rows {
            return Err(AraError::Scoring(format!(
                "model {} returned {} predictions for {} rows",
                model.name(),
                raw.len(),
                rows
            )));
        }
        for (acc, p) in sum.iter_mut().zip(raw) {
            *acc += p;
        }
    }
    let n = models.len() as f64;
    sum.iter_mut().for_each(|v| *v /= n);

    norm01(&mut sum);
    Ok(match calibrator {
        Some(c) => c.apply(&sum),
        None => sum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel {
        name: &'static str,
        out: Vec<f64>,
    }

    impl Model for FixedModel {
        fn predict(&self, _frame: &FeatureFrame) -> Result<Vec<f64>, AraError> {
            Ok(self.out.clone())
        }
        fn name(&self) -> &str {
            self.name
        }
    }

    fn fixed(name: &'static str, out: Vec<f64>) -> Box<dyn Model> {
        Box::new(FixedModel { name, out })
    }

    fn frame(rows: usize) -> FeatureFrame {
        FeatureFrame::from_rows(vec!["f0".into()], vec![vec![0.0]; rows])
    }

    #[test]
    fn averages_members_equally_then_normalizes() {
        let models = vec![
            fixed("a", vec![0.2, 0.4, 0.8]),
            fixed("b", vec![0.4, 0.4, 0.6]),
        ];
        // means: [0.3, 0.4, 0.7] -> normalized: [0.0, 0.25, 1.0]
        let p = predict_mean(&models, None, &frame(3)).unwrap();
        assert!(p[0].abs() < 1e-9);
        assert!((p[1] - 0.25).abs() < 1e-9);
        assert!((p[2] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn renormalizing_at_same_range_is_a_no_op() {
        let mut v = vec![0.3, 0.4, 0.7, 0.1, 0.9];
        norm01(&mut v);
        let once = v.clone();
        // already spans [0, 1]; a second pass must not move anything
        norm01(&mut v);
        for (a, b) in once.iter().zip(&v) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn singleton_batch_scores_zero() {
        // hi == lo on a single row: min-max degenerates to zero, so the
        // same feature vector scored alone and scored in a batch differ.
        let models = vec![fixed("a", vec![0.95])];
        let p = predict_mean(&models, None, &frame(1)).unwrap();
        assert_eq!(p, vec![0.0]);
    }

    #[test]
    fn constant_batch_scores_all_zero() {
        let models = vec![fixed("a", vec![0.6, 0.6, 0.6])];
        let p = predict_mean(&models, None, &frame(3)).unwrap();
        assert_eq!(p, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn calibrator_applies_after_normalization() {
        let c = IsotonicCalibrator::new(vec![0.0, 1.0], vec![0.2, 0.8]).unwrap();
        let models = vec![fixed("a", vec![0.0, 1.0])];
        let p = predict_mean(&models, Some(&c), &frame(2)).unwrap();
        assert!((p[0] - 0.2).abs() < 1e-9);
        assert!((p[1] - 0.8).abs() < 1e-9);
    }

    #[test]
    fn empty_ensemble_is_an_error() {
        let err = predict_mean(&[], None, &frame(1)).unwrap_err();
        assert!(matches!(err, AraError::Scoring(_)));
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let models = vec![fixed("a", vec![0.1])];
        let err = predict_mean(&models, None, &frame(2)).unwrap_err();
        assert!(matches!(err, AraError::Scoring(_)));
    }
}
