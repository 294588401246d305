//! Ensemble inference: bundle loading, boosted-tree prediction, batch
//! normalization and isotonic calibration.
//!
//! The bundle is loaded once at process start and treated as read-only for
//! the rest of the process lifetime; scoring itself is synchronous and
//! deterministic given fixed model weights and input.

pub mod bundle;
pub mod calibrator;
pub mod ensemble;
pub mod features;
pub mod model;

pub use bundle::ModelBundle;
pub use calibrator::IsotonicCalibrator;
pub use ensemble::{norm01, predict_mean, NORM_EPS};
pub use features::{FeatureFrame, NON_FEATURE_COLS};
pub use model::{GbdtModel, Model};
