//! Isotonic probability calibration: a fitted staircase-monotonic map
//! applied unchanged at inference time.

use ara_core::AraError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct CalibratorArtifact {
    x: Vec<f64>,
    y: Vec<f64>,
}

/// Monotonic [0,1] -> [0,1] map stored as sorted (x, y) knots. Lookup
/// interpolates linearly between knots and clamps at the ends.
#[derive(Debug, Clone)]
pub struct IsotonicCalibrator {
    knots: Vec<(f64, f64)>,
}

impl IsotonicCalibrator {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, AraError> {
        if x.is_empty() || x.len() != y.len() {
            return Err(AraError::BundleLoad(
                "calibrator needs equal-length, non-empty x/y knots".into(),
            ));
        }
        if x.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AraError::BundleLoad(
                "calibrator x knots must be strictly increasing".into(),
            ));
        }
        Ok(Self {
            knots: x.into_iter().zip(y).collect(),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, AraError> {
        let artifact: CalibratorArtifact = serde_json::from_str(json)
            .map_err(|e| AraError::BundleLoad(format!("calibrator: {e}")))?;
        Self::new(artifact.x, artifact.y)
    }

    pub fn lookup(&self, value: f64) -> f64 {
        match self
            .knots
            .binary_search_by(|probe| probe.0.partial_cmp(&value).unwrap_or(std::cmp::Ordering::Less))
        {
            Ok(idx) => self.knots[idx].1,
            Err(idx) => {
                if idx == 0 {
                    self.knots[0].1
                } else if idx >= self.knots.len() {
                    self.knots[self.knots.len() - 1].1
                } else {
                    // Linear interpolation between the surrounding knots
                    let (x0, y0) = self.knots[idx - 1];
                    let (x1, y1) = self.knots[idx];
                    let t = (value - x0) / (x1 - x0);
                    y0 + t * (y1 - y0)
                }
            }
        }
    }

    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.lookup(v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calib() -> IsotonicCalibrator {
        IsotonicCalibrator::new(vec![0.0, 0.5, 1.0], vec![0.1, 0.4, 0.9]).unwrap()
    }

    #[test]
    fn exact_knots_and_interpolation() {
        let c = calib();
        assert_eq!(c.lookup(0.5), 0.4);
        assert!((c.lookup(0.25) - 0.25).abs() < 1e-12); // midway 0.1..0.4
        assert!((c.lookup(0.75) - 0.65).abs() < 1e-12); // midway 0.4..0.9
    }

    #[test]
    fn clamps_outside_the_knot_range() {
        let c = calib();
        assert_eq!(c.lookup(-0.2), 0.1);
        assert_eq!(c.lookup(1.7), 0.9);
    }

    #[test]
    fn preserves_monotonicity() {
        let c = calib();
        let inputs = [0.0, 0.1, 0.3, 0.5, 0.7, 0.9, 1.0];
        let out = c.apply(&inputs);
        assert!(out.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn rejects_bad_artifacts() {
        assert!(IsotonicCalibrator::new(vec![], vec![]).is_err());
        assert!(IsotonicCalibrator::new(vec![0.0, 0.0], vec![0.1, 0.2]).is_err());
        assert!(IsotonicCalibrator::from_json_str("{\"x\": [0.0]}").is_err());
        assert!(IsotonicCalibrator::from_json_str("{\"x\": [0.0, 1.0], \"y\": [0.0, 1.0]}").is_ok());
    }
}
