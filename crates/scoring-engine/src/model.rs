//! Boosted-tree models deserialized from their self-describing JSON dump.

use crate::features::FeatureFrame;
use ara_core::AraError;
use serde::Deserialize;

/// One predictor in the ensemble. Implementations must be pure: same
/// weights + same input = same output.
pub trait Model: Send + Sync {
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<f64>, AraError>;
    fn name(&self) -> &str;
}

/// A single gradient-boosted decision tree, stored as parallel node arrays
/// (the layout of the standard booster JSON dump). Node `i` is a leaf when
/// `left_children[i] < 0`; its value is `base_weights[i]`.
#[derive(Debug, Clone, Deserialize)]
struct Tree {
    split_indices: Vec<usize>,
    split_conditions: Vec<f64>,
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    #[serde(default)]
    default_left: Vec<u8>,
    base_weights: Vec<f64>,
}

impl Tree {
    fn validate(&self, num_features: Option<usize>) -> Result<(), String> {
        let n = self.left_children.len();
        if self.right_children.len() != n
            || self.split_indices.len() != n
            || self.split_conditions.len() != n
            || self.base_weights.len() != n
        {
            return Err("tree node arrays have mismatched lengths".into());
        }
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        for i in 0..n {
            let (l, r) = (self.left_children[i], self.right_children[i]);
            if l >= 0 {
                if l as usize >= n || r < 0 || r as usize >= n {
                    return Err(format!("node {i} has out-of-range children"));
                }
                if let Some(nf) = num_features {
                    if self.split_indices[i] >= nf {
                        return Err(format!("node {i} splits on unknown feature"));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk from the root to a leaf. Missing values (NaN) follow the
    /// default direction recorded at each split.
    fn leaf_weight(&self, row: &[f32]) -> f64 {
        let mut i = 0usize;
        loop {
            let left = self.left_children[i];
            if left < 0 {
                return self.base_weights[i];
            }
            let value = row
                .get(self.split_indices[i])
                .copied()
                .unwrap_or(f32::NAN);
            let go_left = if value.is_nan() {
                self.default_left.get(i).copied().unwrap_or(1) != 0
            } else {
                (value as f64) < self.split_conditions[i]
            };
            i = if go_left {
                left as usize
            } else {
                self.right_children[i] as usize
            };
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GbdtArtifact {
    #[serde(default)]
    objective: Option<String>,
    #[serde(default)]
    base_score: f64,
    #[serde(default)]
    num_features: Option<usize>,
    trees: Vec<Tree>,
}

/// A full boosted forest: sum of leaf weights plus the base score, passed
/// through a sigmoid for `binary:logistic` objectives.
#[derive(Debug, Clone)]
pub struct GbdtModel {
    name: String,
    logistic: bool,
    base_score: f64,
    trees: Vec<Tree>,
}

impl GbdtModel {
    pub fn from_json_str(name: &str, json: &str) -> Result<Self, AraError> {
        let artifact: GbdtArtifact = serde_json::from_str(json)
            .map_err(|e| AraError::BundleLoad(format!("{name}: {e}")))?;
        if artifact.trees.is_empty() {
            return Err(AraError::BundleLoad(format!("{name}: model has no trees")));
        }
        for (i, tree) in artifact.trees.iter().enumerate() {
            tree.validate(artifact.num_features)
                .map_err(|e| AraError::BundleLoad(format!("{name}: tree {i}: {e}")))?;
        }
        let logistic = artifact
            .objective
            .as_deref()
            .map(|o| o == "binary:logistic")
            .unwrap_or(true);
        Ok(Self {
            name: name.to_string(),
            logistic,
            base_score: artifact.base_score,
            trees: artifact.trees,
        })
    }

    fn score_row(&self, row: &[f32]) -> f64 {
        let margin: f64 = self.base_score + self.trees.iter().map(|t| t.leaf_weight(row)).sum::<f64>();
        if self.logistic {
            sigmoid(margin)
        } else {
            margin
        }
    }
}

impl Model for GbdtModel {
    fn predict(&self, frame: &FeatureFrame) -> Result<Vec<f64>, AraError> {
        Ok((0..frame.num_rows())
            .map(|i| self.score_row(frame.row(i)))
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
