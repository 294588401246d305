//! Model bundle loading. The bundle is an extracted artifact directory:
//! one or more boosted-forest JSON dumps, an optional isotonic calibrator,
//! an optional required-feature list and a free-form model card.
//!
//! Loaded once per process; failure to load (after the single fallback
//! retry) must abort startup — there is no request-time recovery.

use crate::calibrator::IsotonicCalibrator;
use crate::model::{GbdtModel, Model};
use ara_core::AraError;
use std::path::Path;

const MODEL_PREFIX: &str = "gbdt_seed";
const CALIBRATOR_FILES: [&str; 2] = ["artifacts/isotonic_calibrator.json", "isotonic_calibrator.json"];
const FEATURE_FILES: [&str; 2] = ["feature_cols_final.json", "artifacts/blend_config.json"];
const CARD_FILE: &str = "model_card.json";

pub struct ModelBundle {
    pub models: Vec<Box<dyn Model>>,
    pub calibrator: Option<IsotonicCalibrator>,
    pub required_features: Option<Vec<String>>,
    pub card: serde_json::Value,
}

impl ModelBundle {
    /// Load from `primary`, retrying once against `fallback` on failure.
    pub fn load_with_fallback(primary: &Path, fallback: Option<&Path>) -> Result<Self, AraError> {
        match Self::load(primary) {
            Ok(bundle) => Ok(bundle),
            Err(e) => {
                let Some(fb) = fallback else { return Err(e) };
                tracing::warn!(
                    primary = %primary.display(),
                    fallback = %fb.display(),
                    error = %e,
                    "bundle load failed, trying fallback copy"
                );
                Self::load(fb)
            }
        }
    }

    pub fn load(dir: &Path) -> Result<Self, AraError> {
        let model_files = find_model_files(dir)?;
        let mut models: Vec<Box<dyn Model>> = Vec::new();
        for file in &model_files {
            let name = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "model".to_string());
            let json = std::fs::read_to_string(file)
                .map_err(|e| AraError::BundleLoad(format!("{}: {e}", file.display())))?;
            models.push(Box::new(GbdtModel::from_json_str(&name, &json)?));
        }

        let calibrator = load_calibrator(dir)?;
        let required_features = load_feature_list(dir);
        let card = load_card(dir);

        tracing::info!(
            models = models.len(),
            has_calibrator = calibrator.is_some(),
            features_from_bundle = required_features.is_some(),
            dir = %dir.display(),
            "model bundle ready"
        );

        Ok(Self {
            models,
            calibrator,
            required_features,
            card,
        })
    }

    pub fn num_models(&self) -> usize {
        self.models.len()
    }

    pub fn has_calibrator(&self) -> bool {
        self.calibrator.is_some()
    }
}

/// Seed-named model dumps, sorted for a stable ensemble order. When none
/// match the seed prefix, the first other model-looking JSON is accepted.
fn find_model_files(dir: &Path) -> Result<Vec<std::path::PathBuf>, AraError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AraError::BundleLoad(format!("{}: {e}", dir.display())))?;

    let mut seeded = Vec::new();
    let mut other_json = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if !name.ends_with(".json") {
            continue;
        }
        if name.starts_with(MODEL_PREFIX) {
            seeded.push(path);
        } else if name != CARD_FILE
            && name != "feature_cols_final.json"
            && name != "isotonic_calibrator.json"
        {
            other_json.push(path);
        }
    }
    seeded.sort();
    other_json.sort();

    if !seeded.is_empty() {
        return Ok(seeded);
    }
    match other_json.into_iter().next() {
        Some(first) => Ok(vec![first]),
        None => Err(AraError::BundleLoad(format!(
            "no model JSON files in {}",
            dir.display()
        ))),
    }
}

fn load_calibrator(dir: &Path) -> Result<Option<IsotonicCalibrator>, AraError> {
    for candidate in CALIBRATOR_FILES {
        let path = dir.join(candidate);
        if path.exists() {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| AraError::BundleLoad(format!("{}: {e}", path.display())))?;
            return IsotonicCalibrator::from_json_str(&json).map(Some);
        }
    }
    Ok(None)
}

/// Flat list, or an object with a `feature_cols` key. Unreadable or
/// unexpected content is ignored, not fatal.
fn load_feature_list(dir: &Path) -> Option<Vec<String>> {
    for candidate in FEATURE_FILES {
        let path = dir.join(candidate);
        let Ok(json) = std::fs::read_to_string(&path) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&json) else {
            tracing::warn!(path = %path.display(), "unparseable feature list, ignoring");
            continue;
        };
        let list = match &value {
            serde_json::Value::Array(_) => Some(&value),
            serde_json::Value::Object(map) => map.get("feature_cols"),
            _ => None,
        };
        if let Some(names) = list.and_then(|v| v.as_array()) {
            let parsed: Vec<String> = names
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            if !parsed.is_empty() {
                return Some(parsed);
            }
        }
    }
    None
}

fn load_card(dir: &Path) -> serde_json::Value {
    let path = dir.join(CARD_FILE);
    std::fs::read_to_string(&path)
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_else(|| serde_json::json!({}))
}
